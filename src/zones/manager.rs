//! Per-player zones and card movement.
//!
//! Each player owns four ordered zones. Every zone is an `im::Vector`, so
//! cloning a whole session (transactions, effect snapshots) shares structure
//! instead of copying card lists.
//!
//! The invariant kept here is zone exclusivity inside one player's zones:
//! `move_card` only succeeds when the instance is found in the source zone,
//! and `push` refuses an instance that is already placed.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::InstanceId;

/// The four zones every player has.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Deck,
    Hand,
    Battlefield,
    Graveyard,
}

impl Zone {
    /// All zones in a fixed order.
    pub const ALL: [Zone; 4] = [Zone::Deck, Zone::Hand, Zone::Battlefield, Zone::Graveyard];
}

/// Position for inserting a card into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// End of the zone (top of deck, newest on battlefield).
    Top,
    /// Start of the zone.
    Bottom,
    /// Insert at specific index, clamped to the zone length.
    Index(usize),
}

/// A player's card zones.
///
/// ```
/// use ccg_arena::core::InstanceId;
/// use ccg_arena::zones::{PlayerZones, Zone, ZonePosition};
///
/// let mut zones = PlayerZones::new();
/// zones.push(Zone::Deck, InstanceId(1), ZonePosition::Top);
/// zones.push(Zone::Deck, InstanceId(2), ZonePosition::Top);
///
/// assert_eq!(zones.pop_top(Zone::Deck), Some(InstanceId(2)));
/// assert!(zones.move_card(InstanceId(1), Zone::Deck, Zone::Hand, ZonePosition::Top));
/// assert_eq!(zones.locate(InstanceId(1)), Some(Zone::Hand));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerZones {
    deck: Vector<InstanceId>,
    hand: Vector<InstanceId>,
    battlefield: Vector<InstanceId>,
    graveyard: Vector<InstanceId>,
}

impl PlayerZones {
    /// Create empty zones.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cards in a zone, bottom first.
    #[must_use]
    pub fn cards(&self, zone: Zone) -> &Vector<InstanceId> {
        match zone {
            Zone::Deck => &self.deck,
            Zone::Hand => &self.hand,
            Zone::Battlefield => &self.battlefield,
            Zone::Graveyard => &self.graveyard,
        }
    }

    fn cards_mut(&mut self, zone: Zone) -> &mut Vector<InstanceId> {
        match zone {
            Zone::Deck => &mut self.deck,
            Zone::Hand => &mut self.hand,
            Zone::Battlefield => &mut self.battlefield,
            Zone::Graveyard => &mut self.graveyard,
        }
    }

    /// Number of cards in a zone.
    #[must_use]
    pub fn len(&self, zone: Zone) -> usize {
        self.cards(zone).len()
    }

    /// Check whether a zone holds the instance.
    #[must_use]
    pub fn contains(&self, zone: Zone, instance: InstanceId) -> bool {
        self.cards(zone).iter().any(|&id| id == instance)
    }

    /// Find which of this player's zones holds the instance.
    #[must_use]
    pub fn locate(&self, instance: InstanceId) -> Option<Zone> {
        Zone::ALL.into_iter().find(|&zone| self.contains(zone, instance))
    }

    /// Place an instance into a zone.
    ///
    /// Returns false (and changes nothing) if the instance is already in one
    /// of this player's zones.
    pub fn push(&mut self, zone: Zone, instance: InstanceId, position: ZonePosition) -> bool {
        if self.locate(instance).is_some() {
            return false;
        }

        let cards = self.cards_mut(zone);
        match position {
            ZonePosition::Top => cards.push_back(instance),
            ZonePosition::Bottom => cards.push_front(instance),
            ZonePosition::Index(i) => {
                let idx = i.min(cards.len());
                cards.insert(idx, instance);
            }
        }
        true
    }

    /// Remove an instance from a zone.
    ///
    /// Returns true if the card was found and removed.
    pub fn remove(&mut self, zone: Zone, instance: InstanceId) -> bool {
        let cards = self.cards_mut(zone);
        match cards.iter().position(|&id| id == instance) {
            Some(pos) => {
                cards.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Move an instance between zones.
    ///
    /// Returns false if the instance was not in `from`.
    pub fn move_card(
        &mut self,
        instance: InstanceId,
        from: Zone,
        to: Zone,
        position: ZonePosition,
    ) -> bool {
        if !self.remove(from, instance) {
            return false;
        }
        self.push(to, instance, position)
    }

    /// Take the top card of a zone.
    pub fn pop_top(&mut self, zone: Zone) -> Option<InstanceId> {
        self.cards_mut(zone).pop_back()
    }

    /// Replace a zone's order (used after shuffling).
    ///
    /// The new order must be a permutation of the current contents; anything
    /// else is rejected and the zone is left untouched.
    pub fn reorder(&mut self, zone: Zone, order: Vec<InstanceId>) -> bool {
        let mut current: Vec<_> = self.cards(zone).iter().copied().collect();
        let mut proposed = order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return false;
        }
        *self.cards_mut(zone) = order.into_iter().collect();
        true
    }

    /// Iterate every instance in every zone.
    pub fn all_instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        Zone::ALL.into_iter().flat_map(move |zone| self.cards(zone).iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones_with_deck(ids: &[u32]) -> PlayerZones {
        let mut zones = PlayerZones::new();
        for &id in ids {
            zones.push(Zone::Deck, InstanceId(id), ZonePosition::Top);
        }
        zones
    }

    #[test]
    fn test_push_positions() {
        let mut zones = PlayerZones::new();
        zones.push(Zone::Hand, InstanceId(1), ZonePosition::Top);
        zones.push(Zone::Hand, InstanceId(2), ZonePosition::Bottom);
        zones.push(Zone::Hand, InstanceId(3), ZonePosition::Index(1));

        let order: Vec<_> = zones.cards(Zone::Hand).iter().map(|id| id.raw()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut zones = zones_with_deck(&[1]);
        assert!(!zones.push(Zone::Hand, InstanceId(1), ZonePosition::Top));
        assert_eq!(zones.len(Zone::Hand), 0);
    }

    #[test]
    fn test_move_card() {
        let mut zones = zones_with_deck(&[1, 2]);

        assert!(zones.move_card(InstanceId(1), Zone::Deck, Zone::Battlefield, ZonePosition::Top));
        assert_eq!(zones.locate(InstanceId(1)), Some(Zone::Battlefield));
        assert_eq!(zones.len(Zone::Deck), 1);

        // Not in hand, nothing happens
        assert!(!zones.move_card(InstanceId(2), Zone::Hand, Zone::Graveyard, ZonePosition::Top));
        assert_eq!(zones.locate(InstanceId(2)), Some(Zone::Deck));
    }

    #[test]
    fn test_pop_top_is_last_pushed() {
        let mut zones = zones_with_deck(&[1, 2, 3]);
        assert_eq!(zones.pop_top(Zone::Deck), Some(InstanceId(3)));
        assert_eq!(zones.pop_top(Zone::Deck), Some(InstanceId(2)));
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut zones = zones_with_deck(&[1, 2, 3]);

        assert!(!zones.reorder(Zone::Deck, vec![InstanceId(1), InstanceId(2)]));
        assert!(zones.reorder(Zone::Deck, vec![InstanceId(3), InstanceId(1), InstanceId(2)]));
        assert_eq!(zones.pop_top(Zone::Deck), Some(InstanceId(2)));
    }

    #[test]
    fn test_all_instances() {
        let mut zones = zones_with_deck(&[1, 2]);
        zones.push(Zone::Graveyard, InstanceId(9), ZonePosition::Top);

        let all: Vec<_> = zones.all_instances().collect();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&InstanceId(9)));
    }
}
