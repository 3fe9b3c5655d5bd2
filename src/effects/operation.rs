//! Deferred state mutations queued by effect scripts.
//!
//! An `Operation` is a description of a change, not the change itself. Each
//! script invocation fills its own queue; the applier runs the queue only
//! after the script finished successfully.

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, PlayerId};

/// One queued mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    DamagePlayer {
        player: PlayerId,
        amount: i64,
    },
    DamageCreature {
        instance: InstanceId,
        amount: i64,
    },
    HealPlayer {
        player: PlayerId,
        amount: i64,
    },
    /// `max_health` is the definition's health, captured when queued.
    HealCreature {
        instance: InstanceId,
        amount: i64,
        max_health: i64,
    },
    DestroyCreature {
        instance: InstanceId,
    },
    /// Free-text game log line.
    Log {
        player: PlayerId,
        description: String,
    },
    DrawCard {
        player: PlayerId,
    },
    GainEnergy {
        player: PlayerId,
        amount: i64,
    },
}

impl Operation {
    /// Instance this operation acts on, if any.
    #[must_use]
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            Operation::DamageCreature { instance, .. }
            | Operation::HealCreature { instance, .. }
            | Operation::DestroyCreature { instance } => Some(*instance),
            _ => None,
        }
    }
}
