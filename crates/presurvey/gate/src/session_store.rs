//! Namespaced in-memory session store

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::traits::SessionStore;

/// Keys persisted for a participant between page loads
pub mod session_keys {
    pub const CODE: &str = "code";
    pub const SESSION: &str = "session";
    pub const TOKEN: &str = "token";
}

/// Namespace of the participation flow's persisted keys
pub const DEFAULT_NAMESPACE: &str = "participate";

/// Session store held in memory, keys prefixed by a module namespace.
///
/// Backs tests and embedders that keep their own persistence; the CLI wraps
/// it with a file-backed cookie jar.
#[derive(Debug)]
pub struct MemorySessionStore {
    namespace: String,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed a store from previously persisted (unscoped) entries
    pub fn with_entries<I, K, V>(namespace: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let store = Self::new(namespace);
        for (k, v) in entries {
            store.put(k.as_ref(), &v.into());
        }
        store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Unscoped copy of every entry in this namespace
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let prefix = format!("{}.", self.namespace);
        self.entries
            .read()
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|k| (k.to_string(), v.clone())))
            .collect()
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(&self.scoped(key)).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(self.scoped(key), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(&self.scoped(key));
    }
}
