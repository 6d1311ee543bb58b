//! String-keyed storage for UI state that should survive a reload

use crate::error::Result;
use std::collections::HashMap;

/// Per-column search text, stored as a JSON object of column -> pattern
pub const COLUMN_SEARCH_KEY: &str = "ingot_column_search";

/// The complete filter state (searches, selected values, global search)
pub const COLUMN_FILTERS_KEY: &str = "ingot_column_filters";

/// Minimal key-value store. Values are JSON strings.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process store, the equivalent of per-tab session storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngotError;
    use crate::session::Session;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: String) -> Result<()> {
            Err(IngotError::Store(format!("{} is read-only", key)))
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            Err(IngotError::Store(format!("{} is read-only", key)))
        }
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.set(COLUMN_SEARCH_KEY, "{}".to_string()).unwrap();
        assert_eq!(store.get(COLUMN_SEARCH_KEY).unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove(COLUMN_SEARCH_KEY).unwrap();
        store.remove(COLUMN_SEARCH_KEY).unwrap();
        assert!(store.get(COLUMN_SEARCH_KEY).unwrap().is_none());
    }

    #[test]
    fn test_store_errors_propagate() {
        let session = Session::default();
        let mut store = ReadOnlyStore;

        assert!(matches!(session.save_state(&mut store), Err(IngotError::Store(_))));
        assert!(matches!(session.clear_saved_search(&mut store), Err(IngotError::Store(_))));
    }

    #[test]
    fn test_corrupt_state_is_serialization_error() {
        let mut store = MemoryStore::new();
        store.set(COLUMN_FILTERS_KEY, "{not json".to_string()).unwrap();

        let mut session = Session::default();
        assert!(matches!(session.restore_state(&store), Err(IngotError::Serialization(_))));
    }
}
