//! Card instances - runtime card state.
//!
//! A `CardInstance` is one physical copy of a definition inside a session.
//! Its zone is not stored here: the owner's `PlayerZones` is the single
//! source of truth for location, which keeps zone exclusivity checkable in
//! one place.

use serde::{Deserialize, Serialize};

use super::definition::{CardDefinition, CardId};
use crate::core::{InstanceId, PlayerId};

/// A card instance in a game.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardInstance {
    /// Unique id for this instance.
    pub instance_id: InstanceId,

    /// Reference to the card definition.
    pub card_id: CardId,

    /// Player whose zones hold this card.
    pub owner: PlayerId,

    /// Current health (meaningful for permanents).
    pub current_health: i64,

    /// Has this creature already acted this turn?
    pub sapped: bool,
}

impl CardInstance {
    /// Create an instance with the definition's starting health.
    #[must_use]
    pub fn new(instance_id: InstanceId, definition: &CardDefinition, owner: PlayerId) -> Self {
        Self {
            instance_id,
            card_id: definition.id,
            owner,
            current_health: definition.health,
            sapped: false,
        }
    }

    /// Apply damage, never going below zero.
    ///
    /// Returns the remaining health.
    pub fn take_damage(&mut self, amount: i64) -> i64 {
        self.current_health = (self.current_health - amount.max(0)).max(0);
        self.current_health
    }

    /// Restore health up to `max_health`.
    ///
    /// Returns the amount actually restored.
    pub fn heal(&mut self, amount: i64, max_health: i64) -> i64 {
        let before = self.current_health;
        self.current_health = (self.current_health + amount.max(0)).min(max_health).max(before);
        self.current_health - before
    }

    /// Check if the instance has no health left.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_health <= 0
    }

    /// Mark as having acted this turn.
    pub fn sap(&mut self) {
        self.sapped = true;
    }

    /// Make available again for the new turn.
    pub fn refresh(&mut self) {
        self.sapped = false;
    }
}
