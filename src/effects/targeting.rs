//! Effect targeting system.
//!
//! Defines how effects and attacks select their targets:
//! - `Target`: A player or a permanent on a battlefield
//! - `TargetSelector`: What may be targeted, and how many
//! - `TargetChooser`: The outside party (UI, bot) that picks among candidates
//!
//! Legality is always decided here, never by the chooser. Whatever a chooser
//! returns is re-validated against the current state before use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::cards::{AttackTargeting, CardKind, CardRegistry};
use crate::core::{GameSession, InstanceId, PlayerId};

/// Targets picked for one selection; almost always one or two.
pub type TargetList = SmallVec<[Target; 2]>;

/// Something an effect or attack can be aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Player(PlayerId),
    Creature { instance: InstanceId, owner: PlayerId },
    Artifact { instance: InstanceId, owner: PlayerId },
}

impl Target {
    /// Kind of the target.
    #[must_use]
    pub fn kind(self) -> TargetKind {
        match self {
            Target::Player(_) => TargetKind::Player,
            Target::Creature { .. } => TargetKind::Creature,
            Target::Artifact { .. } => TargetKind::Artifact,
        }
    }

    /// Player on whose side the target is.
    #[must_use]
    pub fn owner(self) -> PlayerId {
        match self {
            Target::Player(player) => player,
            Target::Creature { owner, .. } | Target::Artifact { owner, .. } => owner,
        }
    }

    /// Instance behind a card target.
    #[must_use]
    pub fn instance(self) -> Option<InstanceId> {
        match self {
            Target::Player(_) => None,
            Target::Creature { instance, .. } | Target::Artifact { instance, .. } => Some(instance),
        }
    }

    /// Build the card target for a permanent of the given kind.
    #[must_use]
    pub fn card(kind: CardKind, instance: InstanceId, owner: PlayerId) -> Option<Self> {
        match kind {
            CardKind::Creature => Some(Target::Creature { instance, owner }),
            CardKind::Artifact => Some(Target::Artifact { instance, owner }),
            CardKind::Spell => None,
        }
    }
}

/// Kind filter of a selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Player,
    Creature,
    Artifact,
    Any,
}

/// Targeting request: which targets are legal and how many to pick.
///
/// ## Example
///
/// ```
/// use ccg_arena::effects::{TargetKind, TargetSelector};
///
/// let selector = TargetSelector::enemy_creature().with_count(2);
/// assert_eq!(selector.kind, TargetKind::Creature);
/// assert!(!selector.can_target_self);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSelector {
    pub kind: TargetKind,

    /// Number of targets to pick.
    pub count: usize,

    /// Targets on the source player's side are legal.
    pub can_target_self: bool,

    /// Targets on other players' sides are legal.
    pub can_target_enemies: bool,

    pub can_target_players: bool,
    pub can_target_creatures: bool,
    pub can_target_artifacts: bool,

    /// Optional allow-list on top of `kind`.
    pub allowed_kinds: Option<Vec<TargetKind>>,

    /// Text shown to whoever picks.
    pub prompt: String,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self {
            kind: TargetKind::Any,
            count: 1,
            can_target_self: false,
            can_target_enemies: true,
            can_target_players: true,
            can_target_creatures: true,
            can_target_artifacts: true,
            allowed_kinds: None,
            prompt: String::new(),
        }
    }
}

impl TargetSelector {
    /// Create a selector for one target of `kind` on an enemy side.
    #[must_use]
    pub fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// One enemy creature.
    #[must_use]
    pub fn enemy_creature() -> Self {
        Self::new(TargetKind::Creature)
    }

    /// One enemy player.
    #[must_use]
    pub fn enemy_player() -> Self {
        Self::new(TargetKind::Player)
    }

    /// One friendly creature.
    #[must_use]
    pub fn friendly_creature() -> Self {
        Self::new(TargetKind::Creature).friendly_only()
    }

    /// Anything an attacker with these rules may hit.
    #[must_use]
    pub fn for_attack(rules: &AttackTargeting) -> Self {
        Self {
            kind: TargetKind::Any,
            can_target_players: rules.can_target_players,
            can_target_creatures: rules.can_target_creatures,
            can_target_artifacts: rules.can_target_artifacts,
            ..Self::default()
        }
    }

    /// Set the number of targets (builder pattern).
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Allow the source player's own side as well (builder pattern).
    #[must_use]
    pub fn including_self(mut self) -> Self {
        self.can_target_self = true;
        self
    }

    /// Only the source player's own side (builder pattern).
    #[must_use]
    pub fn friendly_only(mut self) -> Self {
        self.can_target_self = true;
        self.can_target_enemies = false;
        self
    }

    /// Restrict to an allow-list of kinds (builder pattern).
    #[must_use]
    pub fn with_allowed_kinds(mut self, kinds: impl IntoIterator<Item = TargetKind>) -> Self {
        self.allowed_kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Set the prompt (builder pattern).
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Check kind, allow-list and per-kind flags.
    fn kind_allowed(&self, kind: TargetKind) -> bool {
        if self.kind != TargetKind::Any && self.kind != kind {
            return false;
        }
        if let Some(allowed) = &self.allowed_kinds {
            if !allowed.iter().any(|&k| k == kind || k == TargetKind::Any) {
                return false;
            }
        }
        match kind {
            TargetKind::Player => self.can_target_players,
            TargetKind::Creature => self.can_target_creatures,
            TargetKind::Artifact => self.can_target_artifacts,
            TargetKind::Any => true,
        }
    }

    /// Check the self/enemy rule.
    fn side_allowed(&self, source_player: PlayerId, owner: PlayerId) -> bool {
        if owner == source_player {
            self.can_target_self
        } else {
            self.can_target_enemies
        }
    }
}

/// Check one target against a selector and the current state.
///
/// Player targets need an existing seat; card targets need the instance on
/// its owner's battlefield with a definition of the matching kind.
#[must_use]
pub fn validate_target(
    selector: &TargetSelector,
    session: &GameSession,
    catalog: &CardRegistry,
    source_player: PlayerId,
    target: Target,
) -> bool {
    if !selector.kind_allowed(target.kind())
        || !selector.side_allowed(source_player, target.owner())
    {
        return false;
    }

    match target {
        Target::Player(player) => session.players.contains(player),
        Target::Creature { instance, owner } | Target::Artifact { instance, owner } => {
            let Some(card) = session.instance(instance) else {
                return false;
            };
            card.owner == owner
                && session.is_on_battlefield(instance)
                && catalog
                    .get(card.card_id)
                    .and_then(|def| Target::card(def.kind, instance, owner))
                    .is_some_and(|actual| actual == target)
        }
    }
}

/// Enumerate every legal target.
///
/// Order is deterministic: players by seat, then each player's battlefield
/// in insertion order.
#[must_use]
pub fn valid_targets(
    selector: &TargetSelector,
    session: &GameSession,
    catalog: &CardRegistry,
    source_player: PlayerId,
) -> Vec<Target> {
    let players = session.players.player_ids().map(Target::Player);
    let cards = session.players.player_ids().flat_map(|owner| {
        session.battlefield(owner).into_iter().filter_map(move |instance| {
            let card = session.instance(instance)?;
            let def = catalog.get(card.card_id)?;
            Target::card(def.kind, instance, owner)
        })
    });

    players
        .chain(cards)
        .filter(|&target| validate_target(selector, session, catalog, source_player, target))
        .collect()
}

/// Resolve a selection without asking anyone, when the answer is forced.
///
/// Returns `Some(vec![])` when nothing is legal and the single candidate
/// when a single-target selector has exactly one. Anything else is a real
/// choice and returns `None`.
#[must_use]
pub fn auto_targets(
    selector: &TargetSelector,
    session: &GameSession,
    catalog: &CardRegistry,
    source_player: PlayerId,
) -> Option<Vec<Target>> {
    let candidates = valid_targets(selector, session, catalog, source_player);
    match candidates.len() {
        0 => Some(Vec::new()),
        1 if selector.count == 1 => Some(candidates),
        _ => None,
    }
}

/// What a chooser is asked to pick from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRequest {
    pub selector: TargetSelector,

    /// Player the selection acts for.
    pub source_player: PlayerId,

    /// Card the selection comes from, if any.
    pub source_instance: Option<InstanceId>,

    /// Legal targets at the time of asking.
    pub candidates: Vec<Target>,
}

/// Outside party that picks targets (UI, bot, test script).
#[async_trait]
pub trait TargetChooser: Send + Sync {
    /// Pick up to `request.selector.count` targets.
    async fn select_targets(&self, request: &TargetRequest) -> Vec<Target>;
}

/// Always picks the first candidates in enumeration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstTargetChooser;

#[async_trait]
impl TargetChooser for FirstTargetChooser {
    async fn select_targets(&self, request: &TargetRequest) -> Vec<Target> {
        request.candidates.iter().take(request.selector.count).copied().collect()
    }
}

/// Replays a fixed queue of answers, then answers with nothing.
///
/// Records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    answers: Mutex<VecDeque<Vec<Target>>>,
    requests: Mutex<Vec<TargetRequest>>,
}

impl ScriptedChooser {
    /// Create a chooser with queued answers.
    pub fn new(answers: impl IntoIterator<Item = Vec<Target>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<TargetRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TargetChooser for ScriptedChooser {
    async fn select_targets(&self, request: &TargetRequest) -> Vec<Target> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        self.answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default()
    }
}

/// Select targets for `source_player`, asking `chooser` only when needed.
///
/// Chooser answers are re-validated: illegal picks are dropped with a
/// warning, duplicates removed, and the result truncated to `count`.
pub async fn resolve_targets(
    selector: &TargetSelector,
    session: &GameSession,
    catalog: &CardRegistry,
    source_player: PlayerId,
    source_instance: Option<InstanceId>,
    chooser: &dyn TargetChooser,
) -> TargetList {
    if let Some(forced) = auto_targets(selector, session, catalog, source_player) {
        return forced.into_iter().collect();
    }

    let request = TargetRequest {
        selector: selector.clone(),
        source_player,
        source_instance,
        candidates: valid_targets(selector, session, catalog, source_player),
    };
    let picked = chooser.select_targets(&request).await;

    let mut accepted = TargetList::new();
    for target in picked {
        if accepted.len() >= selector.count {
            break;
        }
        if accepted.contains(&target) {
            continue;
        }
        if !validate_target(selector, session, catalog, source_player, target) {
            tracing::warn!(player = %source_player, ?target, "Rejected illegal target pick");
            continue;
        }
        accepted.push(target);
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardId};
    use crate::core::EngineConfig;
    use crate::zones::{Zone, ZonePosition};

    struct Fixture {
        session: GameSession,
        catalog: CardRegistry,
        wolf: InstanceId,
        totem: InstanceId,
        bear: InstanceId,
    }

    fn fixture() -> Fixture {
        let mut catalog = CardRegistry::new();
        let wolf_def = CardDefinition::creature(CardId::new(1), "Wolf", 2, 3, 2);
        let totem_def = CardDefinition::artifact(CardId::new(2), "Totem", 1, 4);
        catalog.register(wolf_def.clone());
        catalog.register(totem_def.clone());

        let mut session = GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap();
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        let mut place = |owner, def: &CardDefinition| {
            session
                .create_instance(owner, def, Zone::Battlefield, ZonePosition::Top)
                .unwrap()
        };
        let wolf = place(p0, &wolf_def);
        let totem = place(p1, &totem_def);
        let bear = place(p1, &wolf_def);

        Fixture { session, catalog, wolf, totem, bear }
    }

    #[test]
    fn test_valid_targets_order() {
        let f = fixture();
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        let selector = TargetSelector::default().including_self();

        let targets = valid_targets(&selector, &f.session, &f.catalog, p0);

        assert_eq!(
            targets,
            vec![
                Target::Player(p0),
                Target::Player(p1),
                Target::Creature { instance: f.wolf, owner: p0 },
                Target::Artifact { instance: f.totem, owner: p1 },
                Target::Creature { instance: f.bear, owner: p1 },
            ]
        );
    }

    #[test]
    fn test_enemy_creature_selector() {
        let f = fixture();
        let selector = TargetSelector::enemy_creature();
        let targets = valid_targets(&selector, &f.session, &f.catalog, PlayerId::new(0));

        assert_eq!(targets, vec![Target::Creature { instance: f.bear, owner: PlayerId::new(1) }]);
    }

    #[test]
    fn test_validate_rejects_mislabelled_kind() {
        let f = fixture();
        let p1 = PlayerId::new(1);
        let fake = Target::Creature { instance: f.totem, owner: p1 };

        let selector = TargetSelector::default();
        assert!(!validate_target(&selector, &f.session, &f.catalog, PlayerId::new(0), fake));
    }

    #[test]
    fn test_validate_rejects_wrong_owner_and_missing() {
        let mut f = fixture();
        let p0 = PlayerId::new(0);
        let stolen = Target::Creature { instance: f.bear, owner: p0 };
        let anyone = TargetSelector::default().including_self();
        assert!(!validate_target(&anyone, &f.session, &f.catalog, p0, stolen));

        let bear = Target::Creature { instance: f.bear, owner: PlayerId::new(1) };
        assert!(validate_target(&TargetSelector::default(), &f.session, &f.catalog, p0, bear));
        f.session.destroy(f.bear);
        assert!(!validate_target(&TargetSelector::default(), &f.session, &f.catalog, p0, bear));
    }

    #[test]
    fn test_allowed_kinds_and_flags() {
        let f = fixture();
        let p0 = PlayerId::new(0);

        let selector = TargetSelector::default().with_allowed_kinds([TargetKind::Artifact]);
        assert_eq!(valid_targets(&selector, &f.session, &f.catalog, p0).len(), 1);

        let rules = AttackTargeting {
            can_target_players: false,
            can_target_creatures: true,
            can_target_artifacts: false,
        };
        let selector = TargetSelector::for_attack(&rules);
        assert_eq!(
            valid_targets(&selector, &f.session, &f.catalog, p0),
            vec![Target::Creature { instance: f.bear, owner: PlayerId::new(1) }]
        );
    }

    #[test]
    fn test_auto_targets() {
        let f = fixture();
        let p0 = PlayerId::new(0);

        // Exactly one enemy player
        let forced = auto_targets(&TargetSelector::enemy_player(), &f.session, &f.catalog, p0);
        assert_eq!(forced, Some(vec![Target::Player(PlayerId::new(1))]));

        // Nothing legal
        let none = TargetSelector::new(TargetKind::Artifact).friendly_only();
        assert_eq!(auto_targets(&none, &f.session, &f.catalog, p0), Some(vec![]));

        // Real choice
        assert_eq!(auto_targets(&TargetSelector::default(), &f.session, &f.catalog, p0), None);

        // One candidate but two wanted is still a choice
        let two = TargetSelector::enemy_player().with_count(2);
        assert_eq!(auto_targets(&two, &f.session, &f.catalog, p0), None);
    }

    #[tokio::test]
    async fn test_resolve_targets_revalidates_chooser() {
        let f = fixture();
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        let bear = Target::Creature { instance: f.bear, owner: p1 };
        let own_wolf = Target::Creature { instance: f.wolf, owner: p0 };

        let chooser = ScriptedChooser::new([vec![own_wolf, bear, bear, Target::Player(p1)]]);
        let selector = TargetSelector::default().with_count(2);

        let picked =
            resolve_targets(&selector, &f.session, &f.catalog, p0, Some(f.wolf), &chooser).await;

        assert_eq!(picked.as_slice(), &[bear, Target::Player(p1)]);
        let requests = chooser.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source_instance, Some(f.wolf));
        assert!(!requests[0].candidates.contains(&own_wolf));
    }

    #[tokio::test]
    async fn test_forced_selection_skips_chooser() {
        let f = fixture();
        let chooser = ScriptedChooser::default();

        let picked = resolve_targets(
            &TargetSelector::enemy_player(),
            &f.session,
            &f.catalog,
            PlayerId::new(0),
            None,
            &chooser,
        )
        .await;

        assert_eq!(picked.as_slice(), &[Target::Player(PlayerId::new(1))]);
        assert!(chooser.requests().is_empty());
    }

    #[tokio::test]
    async fn test_first_target_chooser() {
        let request = TargetRequest {
            selector: TargetSelector::default().with_count(1),
            source_player: PlayerId::new(0),
            source_instance: None,
            candidates: vec![Target::Player(PlayerId::new(1)), Target::Player(PlayerId::new(0))],
        };

        assert_eq!(
            FirstTargetChooser.select_targets(&request).await,
            vec![Target::Player(PlayerId::new(1))]
        );
    }
}
