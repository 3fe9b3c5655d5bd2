//! `GameEngine`: the public face of one session.
//!
//! ## Transactions
//!
//! Every public call is one optimistic transaction:
//!
//! 1. Snapshot the document and remember its `revision`
//! 2. Preload every card definition the snapshot references
//! 3. Run the rule function against the snapshot (awaits included)
//! 4. Commit with a single `change` that checks the revision
//!
//! A validation error discards the working copy and commits only a
//! `failure` log entry. A revision conflict refuses the whole commit and
//! appends a `failure` entry to whatever the document holds now.
//!
//! Errors never escape: operations report success as `bool`.

use std::sync::Arc;

use crate::cards::{CardId, CardRegistry, DefinitionCache};
use crate::core::{
    Clock, EngineConfig, EngineError, GameLogEntry, GameSession, InstanceId, LogAction, PlayerId,
    SessionId, SystemClock,
};
use crate::effects::{valid_targets, Target, TargetChooser, TargetSelector};
use crate::rules::{self, RuleContext};
use crate::zones::Zone;

use super::store::{DocumentHandle, DocumentStore, Observer};

/// Working state of one transaction.
struct Transaction {
    base_revision: u64,
    session: GameSession,
    catalog: CardRegistry,
}

/// Game engine bound to one session document.
pub struct GameEngine {
    handle: Arc<dyn DocumentHandle>,
    store: Arc<dyn DocumentStore>,
    definitions: Arc<DefinitionCache>,
    chooser: Arc<dyn TargetChooser>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl GameEngine {
    /// Bind an engine to an existing document.
    pub fn new(
        handle: Arc<dyn DocumentHandle>,
        store: Arc<dyn DocumentStore>,
        definitions: Arc<DefinitionCache>,
        chooser: Arc<dyn TargetChooser>,
    ) -> Self {
        Self {
            handle,
            store,
            definitions,
            chooser,
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Open the document `id` from `store`.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        id: SessionId,
        definitions: Arc<DefinitionCache>,
        chooser: Arc<dyn TargetChooser>,
    ) -> Result<Self, EngineError> {
        let handle = store.find(id).ok_or(EngineError::SessionNotFound(id))?;
        Ok(Self::new(handle, store, definitions, chooser))
    }

    /// Create a waiting session for `names` in `store` and bind to it.
    pub fn new_game<S: Into<String>>(
        store: Arc<dyn DocumentStore>,
        names: impl IntoIterator<Item = S>,
        config: EngineConfig,
        definitions: Arc<DefinitionCache>,
        chooser: Arc<dyn TargetChooser>,
    ) -> Result<Self, EngineError> {
        let session = GameSession::new(names, &config)?;
        let id = store.create(session);
        Ok(Self::open(store, id, definitions, chooser)?.with_config(config))
    }

    /// Set the engine configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the log clock (builder pattern).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // === Queries ===

    /// Id of the bound document.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.handle.session_id()
    }

    /// Current document contents.
    #[must_use]
    pub fn snapshot(&self) -> GameSession {
        self.handle.doc()
    }

    /// Observe committed changes of the bound document.
    pub fn subscribe(&self, observer: Observer) {
        self.handle.subscribe(observer);
    }

    /// Cards in `player`'s hand they can afford right now.
    pub async fn playable_cards(&self, player: PlayerId) -> Vec<InstanceId> {
        let session = self.snapshot();
        match self.load_catalog(&session, &[]).await {
            Ok(catalog) => rules::playable_cards(&session, &catalog, player),
            Err(_) => Vec::new(),
        }
    }

    /// Creatures `player` can attack with right now.
    pub async fn available_attackers(&self, player: PlayerId) -> Vec<InstanceId> {
        let session = self.snapshot();
        match self.load_catalog(&session, &[]).await {
            Ok(catalog) => rules::available_attackers(&session, &catalog, player),
            Err(_) => Vec::new(),
        }
    }

    /// Everything `attacker` may legally attack.
    pub async fn valid_attack_targets(&self, attacker: InstanceId) -> Vec<Target> {
        let session = self.snapshot();
        let Ok(catalog) = self.load_catalog(&session, &[]).await else {
            return Vec::new();
        };
        let Some(card) = session.instance(attacker) else {
            return Vec::new();
        };
        if session.zone_of(attacker) != Some(Zone::Battlefield) {
            return Vec::new();
        }
        let Some(definition) = catalog.get(card.card_id) else {
            return Vec::new();
        };
        let selector = TargetSelector::for_attack(&definition.attack_targeting);
        valid_targets(&selector, &session, &catalog, card.owner)
    }

    // === Actions ===

    /// Play a creature or artifact from hand, or cast a spell.
    pub async fn play_card(&self, player: PlayerId, instance: InstanceId) -> bool {
        const ACTION: &str = "play card";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = {
            let ctx = self.context(&tx.catalog);
            rules::play_card(&mut tx.session, &ctx, player, instance).await
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Cast a spell from hand.
    pub async fn cast_spell(&self, player: PlayerId, instance: InstanceId) -> bool {
        const ACTION: &str = "cast spell";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = {
            let ctx = self.context(&tx.catalog);
            rules::cast_spell(&mut tx.session, &ctx, player, instance).await
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Attack an enemy player with a creature.
    pub async fn attack_player_with_creature(
        &self,
        player: PlayerId,
        attacker: InstanceId,
        target: PlayerId,
    ) -> bool {
        const ACTION: &str = "attack player";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = {
            let ctx = self.context(&tx.catalog);
            rules::attack_player_with_creature(&mut tx.session, &ctx, player, attacker, target)
                .await
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Attack an enemy creature or artifact with a creature.
    pub async fn attack_creature_with_creature(
        &self,
        player: PlayerId,
        attacker: InstanceId,
        defender: InstanceId,
    ) -> bool {
        const ACTION: &str = "attack creature";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = {
            let ctx = self.context(&tx.catalog);
            rules::attack_creature_with_creature(&mut tx.session, &ctx, player, attacker, defender)
                .await
        };
        self.finish(ACTION, player, tx, result)
    }

    /// End `player`'s turn.
    pub async fn end_player_turn(&self, player: PlayerId) -> bool {
        const ACTION: &str = "end turn";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = match tx.session.require_turn(player) {
            Ok(()) => {
                let ctx = self.context(&tx.catalog);
                rules::end_turn(&mut tx.session, &ctx).await
            }
            Err(err) => Err(err),
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Heal every creature `player` controls by `amount`.
    pub async fn heal_creatures(&self, player: PlayerId, amount: i64) -> bool {
        const ACTION: &str = "heal creatures";
        let mut tx = match self.begin(&[]).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = {
            let ctx = self.context(&tx.catalog);
            rules::heal_creatures(&mut tx.session, &ctx, player, amount)
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Record `player`'s deck; starts the game once every seat has one.
    pub async fn start_game_with_deck(&self, player: PlayerId, deck: Vec<CardId>) -> bool {
        const ACTION: &str = "start game";
        let mut tx = match self.begin(&deck).await {
            Ok(tx) => tx,
            Err(err) => return self.reject(ACTION, player, &err),
        };
        let result = match rules::submit_deck(&mut tx.session, &tx.catalog, player, &deck) {
            Ok(true) => {
                let starting = tx.session.starting_player;
                let ctx = self.context(&tx.catalog);
                rules::start_game(&mut tx.session, &ctx, starting).await
            }
            Ok(false) => Ok(()),
            Err(err) => Err(err),
        };
        self.finish(ACTION, player, tx, result)
    }

    /// Start a rematch of the finished game in a new document.
    ///
    /// Same players and decks; the seat after the previous starting player
    /// goes first. The new session is already playing.
    pub async fn create_rematch_game(&self) -> Option<SessionId> {
        const ACTION: &str = "create rematch";
        let previous = self.snapshot();
        let player = previous.winner.unwrap_or(previous.current_player);

        let result = async {
            let (mut next, starting) = rules::prepare_rematch(&previous, &self.config)?;
            let catalog = self.load_catalog(&next, &[]).await?;
            let ctx = self.context(&catalog);
            rules::start_game(&mut next, &ctx, starting).await?;
            Ok::<_, EngineError>(next)
        }
        .await;

        match result {
            Ok(next) => {
                let id = self.store.create(next);
                tracing::info!(previous = %self.session_id(), session = %id, "Rematch created");
                Some(id)
            }
            Err(err) => {
                self.reject(ACTION, player, &err);
                None
            }
        }
    }

    // === Transactions ===

    fn context<'a>(&'a self, catalog: &'a CardRegistry) -> RuleContext<'a> {
        RuleContext::new(catalog, &self.config, self.clock.as_ref(), self.chooser.as_ref())
    }

    /// Definitions of every card `session` references, plus `extra`.
    async fn load_catalog(
        &self,
        session: &GameSession,
        extra: &[CardId],
    ) -> Result<CardRegistry, EngineError> {
        let referenced = session
            .instances()
            .map(|card| card.card_id)
            .chain(session.players.iter().flat_map(|(_, p)| p.deck_list.iter().copied()))
            .chain(extra.iter().copied());
        Ok(self.definitions.load_all(referenced).await?)
    }

    async fn begin(&self, extra: &[CardId]) -> Result<Transaction, EngineError> {
        let session = self.snapshot();
        let catalog = self.load_catalog(&session, extra).await?;
        Ok(Transaction {
            base_revision: session.revision,
            session,
            catalog,
        })
    }

    fn finish(
        &self,
        action: &str,
        player: PlayerId,
        tx: Transaction,
        result: Result<(), EngineError>,
    ) -> bool {
        match result {
            Ok(()) => self.commit(action, player, tx),
            Err(err) => self.reject(action, player, &err),
        }
    }

    fn commit(&self, action: &str, player: PlayerId, tx: Transaction) -> bool {
        let base = tx.base_revision;
        let mut working = Some(tx.session);
        let mut conflict = None;
        let now = self.clock.now_millis();

        self.handle.change(&mut |doc| {
            if doc.revision != base {
                let err = EngineError::Conflict {
                    expected: base,
                    found: doc.revision,
                };
                let description = err.failure_description(action);
                doc.push_log(GameLogEntry::new(player, LogAction::Failure, description, now));
                doc.revision += 1;
                conflict = Some(err);
                return;
            }
            if let Some(mut next) = working.take() {
                next.revision = base + 1;
                *doc = next;
            }
        });

        match conflict {
            Some(err) => {
                tracing::warn!(player = %player, action, error = %err, "Commit refused");
                false
            }
            None => {
                tracing::debug!(player = %player, action, revision = base + 1, "Committed");
                true
            }
        }
    }

    fn reject(&self, action: &str, player: PlayerId, err: &EngineError) -> bool {
        tracing::warn!(player = %player, action, error = %err, "Action rejected");
        let entry = GameLogEntry::new(
            player,
            LogAction::Failure,
            err.failure_description(action),
            self.clock.now_millis(),
        );
        self.handle.change(&mut |doc| {
            doc.push_log(entry.clone());
            doc.revision += 1;
        });
        false
    }
}
