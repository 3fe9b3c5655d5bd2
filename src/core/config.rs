//! Engine configuration.
//!
//! `EngineConfig` holds the numeric rules of a session (starting health,
//! energy curve, hand size) and the sandbox limits for effect scripts.
//! It is plain serde data so hosts can load it from JSON, and it offers
//! builder methods for code-built configurations.

use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Rules and limits for a game session.
///
/// ## Example
///
/// ```
/// use ccg_arena::core::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_starting_health(20)
///     .with_starting_hand_size(4);
///
/// assert_eq!(config.starting_health, 20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Health (and max health) every player starts with.
    pub starting_health: i64,

    /// Energy (and max energy) every player starts with.
    pub starting_energy: i64,

    /// Max energy gained by every player when the turn order wraps.
    pub energy_per_round: i64,

    /// Upper bound for max energy.
    pub max_energy_cap: i64,

    /// Cards drawn by each player when the game starts.
    pub starting_hand_size: usize,

    /// Health restored to each creature at the start of its owner's turn.
    pub creature_regen_per_turn: i64,

    /// Evaluation steps an effect script may use before it is aborted.
    pub script_step_budget: u32,

    /// Maximum nesting of blocks and expressions inside a script.
    pub script_max_depth: u32,

    /// Seed for deck shuffles.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_health: 30,
            starting_energy: 1,
            energy_per_round: 1,
            max_energy_cap: 10,
            starting_hand_size: 3,
            creature_regen_per_turn: 1,
            script_step_budget: 10_000,
            script_max_depth: 32,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Set starting health.
    #[must_use]
    pub fn with_starting_health(mut self, health: i64) -> Self {
        self.starting_health = health;
        self
    }

    /// Set starting energy.
    #[must_use]
    pub fn with_starting_energy(mut self, energy: i64) -> Self {
        self.starting_energy = energy;
        self
    }

    /// Set the per-round max energy increase.
    #[must_use]
    pub fn with_energy_per_round(mut self, amount: i64) -> Self {
        self.energy_per_round = amount;
        self
    }

    /// Set the max energy cap.
    #[must_use]
    pub fn with_max_energy_cap(mut self, cap: i64) -> Self {
        self.max_energy_cap = cap;
        self
    }

    /// Set the starting hand size.
    #[must_use]
    pub fn with_starting_hand_size(mut self, size: usize) -> Self {
        self.starting_hand_size = size;
        self
    }

    /// Set per-turn creature regeneration.
    #[must_use]
    pub fn with_creature_regen(mut self, amount: i64) -> Self {
        self.creature_regen_per_turn = amount;
        self
    }

    /// Set the script step budget.
    #[must_use]
    pub fn with_script_step_budget(mut self, steps: u32) -> Self {
        self.script_step_budget = steps;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration for values the rules cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.starting_health <= 0 {
            return Err(EngineError::InvalidConfig("starting_health must be positive".into()));
        }
        if self.starting_energy < 0
            || self.energy_per_round < 0
            || self.creature_regen_per_turn < 0
        {
            return Err(EngineError::InvalidConfig(
                "energy and regen values must not be negative".into(),
            ));
        }
        if self.max_energy_cap < self.starting_energy {
            return Err(EngineError::InvalidConfig(
                "max_energy_cap is below starting_energy".into(),
            ));
        }
        if self.script_step_budget == 0 || self.script_max_depth == 0 {
            return Err(EngineError::InvalidConfig("script limits must be non-zero".into()));
        }
        Ok(())
    }
}
