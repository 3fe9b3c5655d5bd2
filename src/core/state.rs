//! Game session state: the authoritative document of one game.
//!
//! ## GameSession
//!
//! - Status, players, active player, turn counter
//! - Card instances (by `InstanceId`) and per-player zones
//! - Append-only game log
//! - RNG state for deck shuffles
//! - Revision counter used for optimistic commits
//!
//! Uses `im` persistent data structures so a full clone is cheap. The engine
//! clones the session for every transaction and every effect snapshot.
//!
//! ## Invariants kept by the mutators here
//!
//! - `0 <= health <= max_health`, `0 <= energy <= max_energy`
//! - an instance is in exactly one zone of its owner
//! - destroying a permanent moves it to the graveyard in the same call
//! - a player at 0 health finishes the game with one `game_end` entry

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::entity::InstanceId;
use super::error::EngineError;
use super::log::{GameLogEntry, LogAction};
use super::player::{PlayerId, PlayerMap};
use super::rng::{GameRng, GameRngState};
use crate::cards::{CardDefinition, CardId, CardInstance, CardKind, CardRegistry};
use crate::zones::{PlayerZones, Zone, ZonePosition};

/// Lifecycle of a session. `Finished` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

/// One player's resources and zones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Seat index.
    pub id: PlayerId,

    /// Display name.
    pub name: String,

    pub health: i64,
    pub max_health: i64,
    pub energy: i64,
    pub max_energy: i64,

    /// Deck, hand, battlefield and graveyard.
    pub zones: PlayerZones,

    /// Definitions the deck was built from (empty until a deck is submitted).
    pub deck_list: Vec<CardId>,
}

impl PlayerState {
    /// Create a player with starting resources from `config`.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            id,
            name: name.into(),
            health: config.starting_health,
            max_health: config.starting_health,
            energy: config.starting_energy,
            max_energy: config.starting_energy,
            zones: PlayerZones::new(),
            deck_list: Vec::new(),
        }
    }

    /// Lose health, never below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: i64) -> i64 {
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        before - self.health
    }

    /// Gain health, never above max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i64) -> i64 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health).max(before);
        self.health - before
    }

    /// Pay `cost` if affordable.
    pub fn spend_energy(&mut self, cost: i64) -> Result<(), EngineError> {
        if cost > self.energy {
            return Err(EngineError::InsufficientEnergy {
                needed: cost,
                available: self.energy,
            });
        }
        self.energy -= cost.max(0);
        Ok(())
    }

    /// Gain energy up to max. Returns the amount actually gained.
    pub fn gain_energy(&mut self, amount: i64) -> i64 {
        let before = self.energy;
        self.energy = (self.energy + amount.max(0)).min(self.max_energy).max(before);
        self.energy - before
    }

    /// Raise max energy by `amount`, capped at `cap`.
    pub fn raise_max_energy(&mut self, amount: i64, cap: i64) {
        self.max_energy = (self.max_energy + amount.max(0)).min(cap).max(self.max_energy.min(cap));
        self.energy = self.energy.min(self.max_energy);
    }

    /// Refill energy.
    pub fn restore_energy(&mut self) {
        self.energy = self.max_energy;
    }

    /// Check if this player has lost.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }
}

/// The authoritative state of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub status: GameStatus,
    pub players: PlayerMap<PlayerState>,

    /// Player whose turn it is.
    pub current_player: PlayerId,

    /// Player who took the first turn.
    pub starting_player: PlayerId,

    /// Turn counter; incremented each time play wraps back to seat 0.
    pub turn: u32,

    /// Append-only audit log.
    pub log: Vector<GameLogEntry>,

    pub winner: Option<PlayerId>,

    /// Bumped by every committed engine transaction.
    pub revision: u64,

    pub rng: GameRngState,

    instances: OrdMap<InstanceId, CardInstance>,
    next_instance_id: InstanceId,
}

impl GameSession {
    /// Create a waiting session for the named players.
    pub fn new<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() < 2 {
            return Err(EngineError::NotEnoughPlayers(names.len()));
        }
        let players = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| PlayerState::new(PlayerId::new(i as u8), name, config))
            .collect();
        let players = PlayerMap::from_vec(players).ok_or(EngineError::NotEnoughPlayers(0))?;

        Ok(Self {
            status: GameStatus::Waiting,
            players,
            current_player: PlayerId::new(0),
            starting_player: PlayerId::new(0),
            turn: 1,
            log: Vector::new(),
            winner: None,
            revision: 0,
            rng: GameRngState::seeded(config.seed),
            instances: OrdMap::new(),
            next_instance_id: InstanceId::FIRST,
        })
    }

    /// Get player count.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.player_count()
    }

    /// Look up a player.
    pub fn player(&self, player: PlayerId) -> Result<&PlayerState, EngineError> {
        self.players.get(player).ok_or(EngineError::UnknownPlayer(player))
    }

    /// Look up a player mutably.
    pub fn player_mut(&mut self, player: PlayerId) -> Result<&mut PlayerState, EngineError> {
        self.players.get_mut(player).ok_or(EngineError::UnknownPlayer(player))
    }

    /// All seats other than `player`, in seat order.
    pub fn opponents_of(&self, player: PlayerId) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.player_ids().filter(move |&p| p != player)
    }

    // === Status ===

    /// Fail unless the session is in `expected`.
    pub fn require_status(&self, expected: GameStatus) -> Result<(), EngineError> {
        if self.status != expected {
            return Err(EngineError::WrongStatus {
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    /// Fail unless the game is running and it is `player`'s turn.
    pub fn require_turn(&self, player: PlayerId) -> Result<(), EngineError> {
        self.require_status(GameStatus::Playing)?;
        self.player(player)?;
        if self.current_player != player {
            return Err(EngineError::NotYourTurn { player });
        }
        Ok(())
    }

    /// Check if the game is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// End the game with `loser` defeated.
    ///
    /// Idempotent: only the first call logs the terminal entry.
    pub fn finish(&mut self, loser: PlayerId, now: u64) {
        if self.is_finished() {
            return;
        }
        self.status = GameStatus::Finished;
        let winner = self
            .opponents_of(loser)
            .find(|&p| self.players.get(p).is_some_and(|state| !state.is_defeated()));
        self.winner = winner;

        let name = self.players.get(loser).map(|p| p.name.clone()).unwrap_or_default();
        tracing::info!(loser = %loser, winner = ?self.winner, "Game finished");
        self.push_log(GameLogEntry::new(
            loser,
            LogAction::GameEnd,
            format!("Player defeated: {name}"),
            now,
        ));
    }

    // === Log ===

    /// Append a log entry.
    pub fn push_log(&mut self, entry: GameLogEntry) {
        self.log.push_back(entry);
    }

    /// Append a plain log entry.
    pub fn log(
        &mut self,
        player: PlayerId,
        action: LogAction,
        description: impl Into<String>,
        now: u64,
    ) {
        self.push_log(GameLogEntry::new(player, action, description, now));
    }

    /// Count log entries with the given action.
    #[must_use]
    pub fn count_log(&self, action: LogAction) -> usize {
        self.log.iter().filter(|entry| entry.action == action).count()
    }

    // === Players ===

    /// Damage a player, finishing the game if health reaches zero.
    ///
    /// Returns the damage actually dealt.
    pub fn damage_player(
        &mut self,
        player: PlayerId,
        amount: i64,
        now: u64,
    ) -> Result<i64, EngineError> {
        let state = self.player_mut(player)?;
        let dealt = state.take_damage(amount);
        if state.is_defeated() {
            self.finish(player, now);
        }
        Ok(dealt)
    }

    /// Heal a player up to max health. Returns the amount restored.
    pub fn heal_player(&mut self, player: PlayerId, amount: i64) -> Result<i64, EngineError> {
        Ok(self.player_mut(player)?.heal(amount))
    }

    // === Instances ===

    /// Look up an instance.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&CardInstance> {
        self.instances.get(&id)
    }

    /// Look up an instance mutably.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut CardInstance> {
        self.instances.get_mut(&id)
    }

    /// Look up an instance or fail.
    pub fn require_instance(&self, id: InstanceId) -> Result<&CardInstance, EngineError> {
        self.instance(id).ok_or(EngineError::UnknownInstance(id))
    }

    /// Iterate all instances in id order.
    pub fn instances(&self) -> impl Iterator<Item = &CardInstance> {
        self.instances.values()
    }

    /// Create an instance of `definition` in one of `owner`'s zones.
    pub fn create_instance(
        &mut self,
        owner: PlayerId,
        definition: &CardDefinition,
        zone: Zone,
        position: ZonePosition,
    ) -> Result<InstanceId, EngineError> {
        self.player(owner)?;
        let id = self.next_instance_id;
        self.next_instance_id = id.next();

        self.instances.insert(id, CardInstance::new(id, definition, owner));
        self.player_mut(owner)?.zones.push(zone, id, position);
        Ok(id)
    }

    /// Zone currently holding the instance.
    #[must_use]
    pub fn zone_of(&self, id: InstanceId) -> Option<Zone> {
        let instance = self.instance(id)?;
        self.players.get(instance.owner)?.zones.locate(id)
    }

    /// Fail unless `player` owns `id` and it sits in `zone`.
    pub fn require_owned_in(
        &self,
        player: PlayerId,
        id: InstanceId,
        zone: Zone,
    ) -> Result<&CardInstance, EngineError> {
        let instance = self.require_instance(id)?;
        if instance.owner != player {
            return Err(EngineError::NotOwner { player, instance: id });
        }
        let actual = self.zone_of(id);
        if actual != Some(zone) {
            return Err(EngineError::WrongZone {
                instance: id,
                expected: zone,
                actual,
            });
        }
        Ok(instance)
    }

    /// Check if the instance is on its owner's battlefield.
    #[must_use]
    pub fn is_on_battlefield(&self, id: InstanceId) -> bool {
        self.zone_of(id) == Some(Zone::Battlefield)
    }

    /// Snapshot of a player's battlefield in insertion order.
    #[must_use]
    pub fn battlefield(&self, player: PlayerId) -> Vec<InstanceId> {
        self.players
            .get(player)
            .map(|p| p.zones.cards(Zone::Battlefield).iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move an instance between its owner's zones.
    pub fn move_instance(
        &mut self,
        id: InstanceId,
        from: Zone,
        to: Zone,
    ) -> Result<(), EngineError> {
        let owner = self.require_instance(id)?.owner;
        let zones = &mut self.player_mut(owner)?.zones;
        if !zones.move_card(id, from, to, ZonePosition::Top) {
            return Err(EngineError::WrongZone {
                instance: id,
                expected: from,
                actual: zones.locate(id),
            });
        }
        Ok(())
    }

    /// Move a permanent from the battlefield to its owner's graveyard.
    ///
    /// Returns false when the instance is no longer on a battlefield.
    pub fn destroy(&mut self, id: InstanceId) -> bool {
        let Some(owner) = self.instance(id).map(|i| i.owner) else {
            return false;
        };
        let Some(player) = self.players.get_mut(owner) else {
            return false;
        };
        if !player.zones.move_card(id, Zone::Battlefield, Zone::Graveyard, ZonePosition::Top) {
            return false;
        }
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.current_health = 0;
            instance.sapped = false;
        }
        true
    }

    /// Draw the top card of `player`'s deck into hand and log it.
    ///
    /// An empty deck is logged and otherwise ignored.
    pub fn draw_card(
        &mut self,
        player: PlayerId,
        now: u64,
    ) -> Result<Option<InstanceId>, EngineError> {
        let state = self.player_mut(player)?;
        let Some(id) = state.zones.pop_top(Zone::Deck) else {
            let text = format!("{}'s deck is empty", state.name);
            self.log(player, LogAction::DrawCard, text, now);
            return Ok(None);
        };
        state.zones.push(Zone::Hand, id, ZonePosition::Top);
        let text = format!("{} draws a card", state.name);
        self.log(player, LogAction::DrawCard, text, now);
        Ok(Some(id))
    }

    /// Shuffle `player`'s deck with the session RNG.
    pub fn shuffle_deck(&mut self, player: PlayerId) -> Result<(), EngineError> {
        let mut rng = GameRng::from_state(&self.rng);
        let zones = &mut self.player_mut(player)?.zones;
        let mut order: Vec<_> = zones.cards(Zone::Deck).iter().copied().collect();
        rng.shuffle(&mut order);
        zones.reorder(Zone::Deck, order);
        self.rng = rng.state();
        Ok(())
    }

    // === Diagnostics ===

    /// Check every structural invariant; returns a description of the first
    /// violation found.
    pub fn check_invariants(&self, catalog: &CardRegistry) -> Result<(), String> {
        for (id, player) in self.players.iter() {
            if !(0..=player.max_health).contains(&player.health) {
                return Err(format!(
                    "{id} health {} outside 0..={}",
                    player.health, player.max_health
                ));
            }
            if !(0..=player.max_energy).contains(&player.energy) {
                return Err(format!(
                    "{id} energy {} outside 0..={}",
                    player.energy, player.max_energy
                ));
            }
        }

        for instance in self.instances.values() {
            let homes = self
                .players
                .iter()
                .flat_map(|(_, p)| Zone::ALL.into_iter().map(move |z| p.zones.cards(z)))
                .map(|cards| cards.iter().filter(|&&c| c == instance.instance_id).count())
                .sum::<usize>();
            if homes != 1 {
                return Err(format!("{} found in {homes} zones", instance.instance_id));
            }
            if let Some(definition) = catalog.get(instance.card_id) {
                let on_field = self.is_on_battlefield(instance.instance_id);
                let health_ok = (1..=definition.health).contains(&instance.current_health);
                if on_field && definition.kind.is_permanent() && !health_ok {
                    return Err(format!(
                        "{} health {} outside 1..={}",
                        instance.instance_id, instance.current_health, definition.health
                    ));
                }
                if on_field && definition.kind == CardKind::Spell {
                    return Err(format!("spell {} on the battlefield", instance.instance_id));
                }
            }
        }

        for (_, player) in self.players.iter() {
            for id in player.zones.all_instances() {
                if self.instance(id).map(|i| i.owner) != Some(player.id) {
                    return Err(format!("{id} in {}'s zones but not owned by them", player.id));
                }
            }
        }

        if self.status == GameStatus::Playing && !self.players.contains(self.current_player) {
            return Err(format!("active player {} does not exist", self.current_player));
        }
        Ok(())
    }
}
