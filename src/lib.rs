//! # ccg-arena
//!
//! Rules engine for a two-or-more player collectible card game: creatures,
//! artifacts and spells, scripted triggered abilities, combat with counter
//! attacks, and turn-based energy.
//!
//! ## Design Principles
//!
//! 1. **One document per game**: `GameSession` is the authoritative state.
//!    It uses `im` persistent structures so snapshots are O(1).
//!
//! 2. **Atomic actions**: every `GameEngine` call runs against a snapshot
//!    and commits once, refusing the commit if the document moved on.
//!
//! 3. **Sandboxed scripts**: card abilities are a typed serde DSL. Scripts
//!    read a snapshot and queue operations; nothing is applied until the
//!    script finishes.
//!
//! 4. **Errors stay inside**: rule code returns `Result`; the engine turns
//!    failures into a `false` return and a game log entry.
//!
//! ## Modules
//!
//! - `core`: ids, players, session state, errors, log, config, RNG
//! - `zones`: per-player deck, hand, battlefield and graveyard
//! - `cards`: definitions, instances and the definition catalog
//! - `effects`: targeting, the script interpreter and operation applier
//! - `triggers`: triggered ability dispatch
//! - `combat`: attack resolution
//! - `rules`: player actions and the turn controller
//! - `engine`: `GameEngine` and the document store

pub mod cards;
pub mod combat;
pub mod core;
pub mod effects;
pub mod engine;
pub mod rules;
pub mod triggers;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    CatalogError, Clock, EffectError, EngineConfig, EngineError, GameLogEntry, GameSession,
    GameStatus, InstanceId, LogAction, ManualClock, PlayerId, PlayerMap, PlayerState, SessionId,
    SystemClock,
};

pub use crate::zones::{Zone, ZonePosition};

pub use crate::cards::{
    AttackTargeting, CardDefinition, CardDefinitionStore, CardId, CardInstance, CardKind,
    CardRegistry, DefinitionCache, TriggerEvent, TriggeredAbility,
};

pub use crate::effects::{
    Expr, FirstTargetChooser, Script, ScriptedChooser, Side, Stmt, Target, TargetChooser,
    TargetKind, TargetSelector,
};

pub use crate::engine::{DocumentHandle, DocumentStore, GameEngine, MemoryDocumentStore};
