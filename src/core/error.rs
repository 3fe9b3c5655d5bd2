//! Error types.
//!
//! Internal rule code returns `Result<_, EngineError>` and propagates with
//! `?`. The public `GameEngine` boundary turns errors into a `false` return
//! plus a game log entry, so none of these cross into the presentation layer.

use thiserror::Error;

use super::entity::{InstanceId, SessionId};
use super::player::PlayerId;
use super::state::GameStatus;
use crate::cards::{CardId, CardKind};
use crate::zones::Zone;

/// Errors raised while validating or executing a player action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Action requires a different session status
    #[error("game is {actual:?}, expected {expected:?}")]
    WrongStatus {
        /// Status the action needs
        expected: GameStatus,
        /// Current status
        actual: GameStatus,
    },

    /// Acting player is not the active player
    #[error("it is not {player}'s turn")]
    NotYourTurn {
        /// Player who tried to act
        player: PlayerId,
    },

    /// Player seat does not exist
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Instance does not exist in the session
    #[error("unknown card instance: {0}")]
    UnknownInstance(InstanceId),

    /// Instance belongs to another player
    #[error("{instance} is not owned by {player}")]
    NotOwner {
        /// Acting player
        player: PlayerId,
        /// Instance they tried to use
        instance: InstanceId,
    },

    /// Instance is not in the zone the action needs
    #[error("{instance} is in {actual:?}, expected {expected:?}")]
    WrongZone {
        /// Instance being used
        instance: InstanceId,
        /// Zone the action needs
        expected: Zone,
        /// Zone the instance is actually in
        actual: Option<Zone>,
    },

    /// Card kind does not support the action
    #[error("{instance} is a {kind:?} and cannot {action}")]
    WrongKind {
        /// Instance being used
        instance: InstanceId,
        /// Its card kind
        kind: CardKind,
        /// What was attempted
        action: &'static str,
    },

    /// Not enough energy to pay a cost
    #[error("insufficient energy: need {needed}, have {available}")]
    InsufficientEnergy {
        /// Cost of the card
        needed: i64,
        /// Player's current energy
        available: i64,
    },

    /// Creature already acted this turn
    #[error("{0} is sapped")]
    Sapped(InstanceId),

    /// Target failed validation
    #[error("illegal target: {0}")]
    IllegalTarget(String),

    /// Heal or damage amount below zero
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Player already submitted a deck
    #[error("{0} already has a deck")]
    DeckAlreadySet(PlayerId),

    /// Deck list is empty
    #[error("deck is empty")]
    EmptyDeck,

    /// Session needs at least two players
    #[error("a game needs at least 2 players, got {0}")]
    NotEnoughPlayers(usize),

    /// Session missing from the document store
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Document changed while the action was running
    #[error("document changed concurrently (revision {expected} -> {found})")]
    Conflict {
        /// Revision the action started from
        expected: u64,
        /// Revision found at commit time
        found: u64,
    },

    /// Card definition lookup failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Effect script raised or broke a sandbox limit
    #[error("{label} failed: {source}")]
    Effect {
        /// Ability or spell label
        label: String,
        /// Interpreter error
        source: EffectError,
    },

    /// Effect script returned false
    #[error("{0} failed")]
    EffectDeclined(String),

    /// Invalid engine configuration
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Game log text for a rejected `action`.
    ///
    /// Effect failures read "<label> failed"; everything else reads
    /// "Failed to <action>: <reason>".
    #[must_use]
    pub fn failure_description(&self, action: &str) -> String {
        match self {
            EngineError::Effect { label, .. } | EngineError::EffectDeclined(label) => {
                format!("{label} failed")
            }
            other => format!("Failed to {action}: {other}"),
        }
    }
}

/// Errors raised inside the effect interpreter.
///
/// Any of these aborts the whole invocation; its queued operations are
/// discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// Script referenced an unbound variable
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    /// Value had the wrong type for the operation
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },

    /// Call is outside the invocation's capabilities
    #[error("capability denied: {0}")]
    CapabilityDenied(&'static str),

    /// Script evaluated too many steps
    #[error("step budget of {0} exhausted")]
    BudgetExhausted(u32),

    /// Script nested too deeply
    #[error("nesting deeper than {0}")]
    TooDeep(u32),

    /// Script raised an error on purpose
    #[error("{0}")]
    Raised(String),

    /// Expression needed state that does not exist
    #[error("missing value: {0}")]
    Missing(String),

    /// Damage or heal amount below zero
    #[error("negative amount: {0}")]
    NegativeAmount(i64),

    /// Arithmetic overflowed
    #[error("arithmetic overflow")]
    Overflow,
}

/// Errors raised by card definition stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No definition with this id
    #[error("unknown card: {0}")]
    UnknownCard(CardId),

    /// Definition is malformed
    #[error("invalid card definition: {0}")]
    Invalid(String),

    /// Catalog document could not be parsed
    #[error("catalog parse error: {0}")]
    Parse(String),

    /// Backing store failed
    #[error("definition store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}
