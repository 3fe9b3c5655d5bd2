//! Combat between creatures, artifacts and players.
//!
//! Only creatures attack. Creatures and artifacts can be attacked; only
//! creatures with positive attack strike back.

mod resolver;

pub use resolver::{attack_creature, attack_player};
