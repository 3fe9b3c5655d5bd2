//! Document store: where session documents live between engine calls.
//!
//! A `DocumentHandle` gives access to one authoritative `GameSession`.
//! `change` is the only way to mutate it; the closure runs under the
//! document's lock and every subscriber is notified once it returns.
//! `MemoryDocumentStore` keeps documents in process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::core::{GameSession, SessionId};

/// Callback run after every committed change.
pub type Observer = Box<dyn Fn(&GameSession) + Send + Sync>;

/// Handle to one session document.
pub trait DocumentHandle: Send + Sync {
    /// Id of the document in its store.
    fn session_id(&self) -> SessionId;

    /// Current contents.
    fn doc(&self) -> GameSession;

    /// Atomically mutate the document, then notify subscribers.
    fn change(&self, apply: &mut dyn FnMut(&mut GameSession));

    /// Register an observer of committed changes.
    fn subscribe(&self, observer: Observer);
}

/// Creates and finds session documents.
pub trait DocumentStore: Send + Sync {
    /// Store a new document and return its id.
    fn create(&self, session: GameSession) -> SessionId;

    /// Look up a document.
    fn find(&self, id: SessionId) -> Option<Arc<dyn DocumentHandle>>;
}

/// In-process document.
pub struct MemoryDocument {
    id: SessionId,
    doc: Mutex<GameSession>,
    observers: Mutex<Vec<Observer>>,
}

impl MemoryDocument {
    pub fn new(id: SessionId, session: GameSession) -> Self {
        Self {
            id,
            doc: Mutex::new(session),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl DocumentHandle for MemoryDocument {
    fn session_id(&self) -> SessionId {
        self.id
    }

    fn doc(&self) -> GameSession {
        self.doc.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn change(&self, apply: &mut dyn FnMut(&mut GameSession)) {
        let committed = {
            let mut doc = self.doc.lock().unwrap_or_else(|e| e.into_inner());
            apply(&mut *doc);
            doc.clone()
        };
        // Observers run outside the document lock so they may read it again.
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer(&committed);
        }
    }

    fn subscribe(&self, observer: Observer) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }
}

/// In-process document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<FxHashMap<SessionId, Arc<MemoryDocument>>>,
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn create(&self, session: GameSession) -> SessionId {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let document = Arc::new(MemoryDocument::new(id, session));
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, document);
        tracing::debug!(session = %id, "Document created");
        id
    }

    fn find(&self, id: SessionId) -> Option<Arc<dyn DocumentHandle>> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents
            .get(&id)
            .map(|doc| Arc::clone(doc) as Arc<dyn DocumentHandle>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use std::sync::atomic::AtomicUsize;

    fn session() -> GameSession {
        GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_create_and_find() {
        let store = MemoryDocumentStore::new();
        let a = store.create(session());
        let b = store.create(session());

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find(a).unwrap().session_id(), a);
        assert!(store.find(SessionId::new(99)).is_none());
    }

    #[test]
    fn test_change_is_visible_and_notifies() {
        let store = MemoryDocumentStore::new();
        let id = store.create(session());
        let handle = store.find(id).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        handle.subscribe(Box::new(move |doc| {
            counter.store(doc.revision as usize, Ordering::SeqCst);
        }));

        handle.change(&mut |doc| doc.revision += 3);

        assert_eq!(handle.doc().revision, 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_handles_share_one_document() {
        let store = MemoryDocumentStore::new();
        let id = store.create(session());
        let first = store.find(id).unwrap();
        let second = store.find(id).unwrap();

        first.change(&mut |doc| doc.turn = 5);

        assert_eq!(second.doc().turn, 5);
    }
}
