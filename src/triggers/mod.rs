//! Trigger system for event-driven abilities.
//!
//! Cards carry `TriggeredAbility` entries keyed by `TriggerEvent`. Rule code
//! calls the dispatcher at fixed points (turn start and end, card played,
//! damage dealt and taken), and the dispatcher runs the matching abilities
//! of the permanents involved.
//!
//! ## Ordering
//!
//! Abilities fire in battlefield insertion order, then definition order, so
//! the same state always produces the same log.

mod dispatcher;

pub use dispatcher::{
    execute_triggered_abilities, execute_triggered_abilities_for_creature, TriggerContext,
    TriggerReport,
};
