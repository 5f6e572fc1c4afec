//! File-backed cookie jar
//!
//! The file holds one object per namespace, each a flat map of unscoped
//! keys to values. Other namespaces in the file are carried through
//! untouched on every write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use presurvey_gate::{MemorySessionStore, SessionStore};
use tracing::warn;

use crate::error::CliResult;

type JarContents = BTreeMap<String, BTreeMap<String, String>>;

/// Session store persisted to a JSON file after every write
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    inner: MemorySessionStore,
}

impl FileSessionStore {
    /// Open the jar at `path`; a missing file is an empty jar
    pub fn open(path: impl Into<PathBuf>, namespace: &str) -> CliResult<Self> {
        let path = path.into();
        let mut jar = read_jar(&path)?;
        let entries = jar.remove(namespace).unwrap_or_default();
        Ok(Self {
            path,
            inner: MemorySessionStore::with_entries(namespace, entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries of this store's namespace
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.inner.snapshot()
    }

    /// Remove every entry of this store's namespace
    pub fn clear(&self) -> CliResult<()> {
        for key in self.inner.snapshot().keys() {
            self.inner.remove(key);
        }
        self.persist()
    }

    fn persist(&self) -> CliResult<()> {
        let mut jar = read_jar(&self.path)?;
        let entries = self.inner.snapshot();
        if entries.is_empty() {
            jar.remove(self.inner.namespace());
        } else {
            jar.insert(self.inner.namespace().to_string(), entries);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&jar)?)?;
        Ok(())
    }

    fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            warn!(path = %self.path.display(), error = %e, "Failed to write session file");
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) {
        self.inner.put(key, value);
        self.persist_or_warn();
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
        self.persist_or_warn();
    }
}

fn read_jar(path: &Path) -> CliResult<JarContents> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(JarContents::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JarContents::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use presurvey_gate::session_keys;

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar/session.json");

        let store = FileSessionStore::open(&path, "participate").unwrap();
        assert_eq!(store.get(session_keys::SESSION), None);
        store.put(session_keys::SESSION, "2");
        store.put(session_keys::CODE, "trout viper");

        let reopened = FileSessionStore::open(&path, "participate").unwrap();
        assert_eq!(reopened.get(session_keys::SESSION).as_deref(), Some("2"));
        assert_eq!(reopened.entries().len(), 2);
    }

    #[test]
    fn namespaces_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let a = FileSessionStore::open(&path, "participate").unwrap();
        a.put(session_keys::TOKEN, "tok-a");
        let b = FileSessionStore::open(&path, "admin").unwrap();
        b.put(session_keys::TOKEN, "tok-b");

        let a = FileSessionStore::open(&path, "participate").unwrap();
        assert_eq!(a.get(session_keys::TOKEN).as_deref(), Some("tok-a"));
        a.clear().unwrap();

        let b = FileSessionStore::open(&path, "admin").unwrap();
        assert_eq!(b.get(session_keys::TOKEN).as_deref(), Some("tok-b"));
        assert!(FileSessionStore::open(&path, "participate")
            .unwrap()
            .entries()
            .is_empty());
    }

    #[test]
    fn remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::open(&path, "participate").unwrap();
        store.put(session_keys::CODE, "x");
        store.remove(session_keys::CODE);

        let reopened = FileSessionStore::open(&path, "participate").unwrap();
        assert_eq!(reopened.get(session_keys::CODE), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileSessionStore::open(&path, "participate"),
            Err(CliError::SessionFormat(_))
        ));
    }
}
