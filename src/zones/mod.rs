//! Zone system for card locations.
//!
//! Every player has a deck, a hand, a battlefield and a graveyard. An
//! instance lives in exactly one of these at any observed state.
//!
//! ## Key Types
//!
//! - `Zone`: Closed enum of the four zones
//! - `PlayerZones`: One player's zones and card movement
//! - `ZonePosition`: Insertion position

pub mod manager;

pub use manager::{PlayerZones, Zone, ZonePosition};
