//! Game log: the append-only audit trail of a session.
//!
//! Every rule transition that a player should be able to see appends one
//! `GameLogEntry`. Entries are never edited or removed. Timestamps come from
//! an injected `Clock` so tests can pin them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::effects::Target;

/// Kind of event recorded in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    GameStart,
    GameEnd,
    PlayCard,
    CastSpell,
    Attack,
    EndTurn,
    StartTurn,
    DrawCard,
    Ability,
    AbilityFailed,
    Damage,
    Heal,
    Destroy,
    GainEnergy,
    /// Free-text entry written by an effect script.
    Effect,
    /// A rejected player action.
    Failure,
}

/// One immutable audit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogEntry {
    /// Player the entry is about.
    pub player: PlayerId,

    /// What happened.
    pub action: LogAction,

    /// Numeric detail (damage dealt, energy gained, ...).
    pub amount: Option<i64>,

    /// Target of the action, if any.
    pub target: Option<Target>,

    /// Human-readable narrative.
    pub description: String,

    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl GameLogEntry {
    /// Create an entry without amount or target.
    #[must_use]
    pub fn new(
        player: PlayerId,
        action: LogAction,
        description: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            player,
            action,
            amount: None,
            target: None,
            description: description.into(),
            timestamp,
        }
    }

    /// Attach an amount (builder pattern).
    #[must_use]
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attach a target (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

/// Source of log timestamps.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
