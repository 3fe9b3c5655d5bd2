//! Card catalog: definition lookup and the load-once definition cache.
//!
//! - `CardRegistry`: in-memory map of definitions, loadable from JSON. Rule
//!   code reads definitions synchronously from a registry.
//! - `CardDefinitionStore`: async collaborator that resolves a definition id,
//!   possibly over the network. `CardRegistry` implements it for tests and
//!   embedded catalogs.
//! - `DefinitionCache`: wraps a store and fetches each definition at most
//!   once per session. The engine preloads everything a session references
//!   before running rule code, so cache misses only suspend at that point.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use super::definition::{CardDefinition, CardId};
use crate::core::CatalogError;

/// Registry of card definitions.
///
/// ## Example
///
/// ```
/// use ccg_arena::cards::{CardRegistry, CardDefinition, CardId};
///
/// let mut registry = CardRegistry::new();
/// registry.register(CardDefinition::creature(CardId::new(1), "Grey Wolf", 2, 3, 2));
///
/// let found = registry.get(CardId::new(1)).unwrap();
/// assert_eq!(found.name, "Grey Wolf");
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, Arc<CardDefinition>>,
}

impl CardRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card definition.
    ///
    /// Panics if a card with the same ID already exists.
    pub fn register(&mut self, card: CardDefinition) {
        if let Err(err) = self.try_register(card) {
            panic!("{err}");
        }
    }

    /// Register a card definition, rejecting duplicates and invalid cards.
    pub fn try_register(&mut self, card: CardDefinition) -> Result<(), CatalogError> {
        if self.cards.contains_key(&card.id) {
            return Err(CatalogError::Invalid(format!("{} already registered", card.id)));
        }
        card.validate()?;
        self.cards.insert(card.id, Arc::new(card));
        Ok(())
    }

    /// Insert a shared definition, replacing any previous entry.
    pub fn insert_shared(&mut self, card: Arc<CardDefinition>) {
        self.cards.insert(card.id, card);
    }

    /// Load a registry from a JSON array of definitions.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let cards: Vec<CardDefinition> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for card in cards {
            registry.try_register(card)?;
        }
        Ok(registry)
    }

    /// Get a card definition by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Arc<CardDefinition>> {
        self.cards.get(&id)
    }

    /// Get a card definition, or a `CatalogError` naming the missing id.
    pub fn require(&self, id: CardId) -> Result<&Arc<CardDefinition>, CatalogError> {
        self.cards.get(&id).ok_or(CatalogError::UnknownCard(id))
    }

    /// Check if a card ID is registered.
    #[must_use]
    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    /// Get the number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over all card definitions.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CardDefinition>> {
        self.cards.values()
    }
}

/// Resolves card definitions by id.
#[async_trait]
pub trait CardDefinitionStore: Send + Sync {
    /// Fetch one definition.
    async fn fetch(&self, id: CardId) -> Result<CardDefinition, CatalogError>;
}

#[async_trait]
impl CardDefinitionStore for CardRegistry {
    async fn fetch(&self, id: CardId) -> Result<CardDefinition, CatalogError> {
        self.require(id).map(|card| CardDefinition::clone(card))
    }
}

/// Load-once cache in front of a `CardDefinitionStore`.
///
/// Cached entries are consulted before any fetch. Fetched definitions are
/// validated before they are cached.
pub struct DefinitionCache {
    store: Arc<dyn CardDefinitionStore>,
    cached: Mutex<CardRegistry>,
}

impl DefinitionCache {
    /// Create an empty cache over `store`.
    pub fn new(store: Arc<dyn CardDefinitionStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(CardRegistry::new()),
        }
    }

    fn cached_copy(&self, id: CardId) -> Option<Arc<CardDefinition>> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.get(id).cloned()
    }

    /// Resolve one definition, fetching it on a cache miss.
    pub async fn resolve(&self, id: CardId) -> Result<Arc<CardDefinition>, CatalogError> {
        if let Some(card) = self.cached_copy(id) {
            return Ok(card);
        }

        tracing::debug!(card = %id, "Fetching card definition");
        let card = self.store.fetch(id).await?;
        if card.id != id {
            return Err(CatalogError::Invalid(format!("store returned {} for {}", card.id, id)));
        }
        card.validate()?;

        let card = Arc::new(card);
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have raced us; keep the first copy.
        if let Some(existing) = cached.get(id) {
            return Ok(existing.clone());
        }
        cached.insert_shared(card.clone());
        Ok(card)
    }

    /// Resolve every id and return a registry holding exactly those cards.
    pub async fn load_all(
        &self,
        ids: impl IntoIterator<Item = CardId>,
    ) -> Result<CardRegistry, CatalogError> {
        let mut registry = CardRegistry::new();
        for id in ids {
            if registry.contains(id) {
                continue;
            }
            let card = self.resolve(id).await?;
            registry.insert_shared(card);
        }
        Ok(registry)
    }

    /// Number of cached definitions.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cached.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl std::fmt::Debug for DefinitionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionCache")
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}
