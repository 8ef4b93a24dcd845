//! Locally persisted session state
//!
//! The request core only ever touches one entry: the signed-in user, which is
//! removed when the API answers 401.

use dashmap::DashMap;

/// Key of the persisted session entry cleared on 401
pub const SESSION_KEY: &str = "user";

/// Storage for session values owned by the embedding application
pub trait SessionStore: Send + Sync {
    /// Read a stored value
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value
    fn set(&self, key: &str, value: String);

    /// Remove a stored value
    fn remove(&self, key: &str);
}

/// In-process session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: DashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| value.clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        assert!(store.get(SESSION_KEY).is_none());

        store.set(SESSION_KEY, r#"{"id":7}"#.to_string());
        assert_eq!(store.get(SESSION_KEY).as_deref(), Some(r#"{"id":7}"#));

        store.remove(SESSION_KEY);
        assert!(store.get(SESSION_KEY).is_none());
    }
}
