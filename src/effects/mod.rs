//! Effect system for card abilities and spells.
//!
//! - `Script`: typed effect language (serde data)
//! - `Target` / `TargetSelector`: what an effect or attack may hit
//! - `Interpreter` / `EffectApi`: runs a script against a snapshot and
//!   collects `Operation`s
//! - `apply_operations` / `sweep_destroyed`: commit collected operations
//!
//! ## Design Philosophy
//!
//! Scripts never mutate state. A script run produces a queue of operations,
//! and the queue is applied only if the whole run succeeded. A failing
//! script therefore leaves no partial effects behind.

mod applier;
mod interpreter;
mod operation;
mod script;
mod targeting;

pub use applier::{apply_operations, sweep_destroyed, ApplyReport};
pub use interpreter::{EffectApi, Interpreter, Invocation, InvocationKind, InvocationOutcome};
pub use operation::Operation;
pub use script::{Expr, Script, Side, Stmt, Value};
pub use targeting::{
    auto_targets, resolve_targets, valid_targets, validate_target, FirstTargetChooser,
    ScriptedChooser, Target, TargetChooser, TargetKind, TargetList, TargetRequest, TargetSelector,
};
