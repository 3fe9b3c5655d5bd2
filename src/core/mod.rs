//! Core engine types: identifiers, players, session state, log, RNG,
//! configuration and errors.
//!
//! Everything here is plain data plus the invariant-preserving mutators on
//! `GameSession`. Rule sequencing lives in `rules`, `combat` and `triggers`.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod error;
pub mod log;
pub mod state;

pub use entity::{InstanceId, SessionId};
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use config::EngineConfig;
pub use error::{CatalogError, EffectError, EngineError};
pub use log::{Clock, GameLogEntry, LogAction, ManualClock, SystemClock};
pub use state::{GameSession, GameStatus, PlayerState};
