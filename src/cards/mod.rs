//! Card system: definitions, instances, and the catalog.
//!
//! ## Key Types
//!
//! - `CardId`: Identifier for card definitions
//! - `CardKind`: Creature, spell or artifact
//! - `CardDefinition`: Static card data, abilities and spell script
//! - `CardInstance`: Runtime card state (health, sapped)
//! - `CardRegistry`: In-memory definition lookup
//! - `CardDefinitionStore` / `DefinitionCache`: async definition source and
//!   its load-once cache

pub mod definition;
pub mod instance;
pub mod registry;

pub use definition::{
    AttackTargeting, CardDefinition, CardId, CardKind, TriggerEvent, TriggeredAbility,
};
pub use instance::CardInstance;
pub use registry::{CardDefinitionStore, CardRegistry, DefinitionCache};
