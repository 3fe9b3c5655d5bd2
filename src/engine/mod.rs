//! Session engine and document storage.
//!
//! - `GameEngine`: one atomic transaction per player action
//! - `DocumentStore` / `DocumentHandle`: where session documents live

mod game;
mod store;

pub use game::GameEngine;
pub use store::{DocumentHandle, DocumentStore, MemoryDocument, MemoryDocumentStore, Observer};
