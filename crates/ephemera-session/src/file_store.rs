//! Flat-file persistence for session records.
//!
//! The whole store is one JSON document, `{ "sessions": [...] }`, rewritten
//! in full on every persist. Every load/modify/write sequence runs under a
//! single writer lock so concurrent persists from different sessions cannot
//! lose each other's updates, and writes land via a temporary file and
//! rename so a concurrent reader never observes a partial document.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::Result;

/// Persisted snapshot of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: String,

    /// Scoped key/value data.
    pub data: Map<String, Value>,

    /// Remaining lifetime in seconds.
    pub lifetime: u64,
}

/// The persisted store document: every session, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    pub sessions: Vec<SessionSnapshot>,
}

struct FileStoreInner {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Handle to the backing session file.
///
/// Cloning is cheap; all clones share one writer lock.
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

impl FileStore {
    /// Open the backing file, creating an empty document if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            inner: Arc::new(FileStoreInner {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
        };

        {
            let _guard = store.inner.write_lock.lock();
            if !store.inner.path.exists() {
                store.write_document(&StoreDocument::default())?;
            }
        }

        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Read the full document.
    ///
    /// A missing or unparseable file is reinitialized to the empty document
    /// and the empty document is returned; this read self-heals rather than
    /// failing. Genuine IO errors still propagate.
    pub fn load(&self) -> Result<StoreDocument> {
        let _guard = self.inner.write_lock.lock();
        self.read_or_heal()
    }

    /// Whether a session with the given id is currently persisted.
    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.load()?.sessions.iter().any(|s| s.id == id))
    }

    /// Write one session's snapshot into the document.
    ///
    /// An existing entry with the same id is replaced in place; otherwise
    /// the snapshot is appended, so insertion order is preserved across
    /// updates.
    pub fn upsert(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let _guard = self.inner.write_lock.lock();
        let mut document = self.read_or_heal()?;

        match document.sessions.iter_mut().find(|s| s.id == snapshot.id) {
            Some(slot) => *slot = snapshot.clone(),
            None => document.sessions.push(snapshot.clone()),
        }

        trace!(session_id = %snapshot.id, "persisting session snapshot");
        self.write_document(&document)
    }

    /// Remove a session's entry from the document. Absent ids are not an
    /// error.
    pub fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.inner.write_lock.lock();
        let mut document = self.read_or_heal()?;
        document.sessions.retain(|s| s.id != id);
        self.write_document(&document)
    }

    fn read_or_heal(&self) -> Result<StoreDocument> {
        match fs::read_to_string(&self.inner.path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(document) => Ok(document),
                Err(err) => {
                    warn!(
                        path = %self.inner.path.display(),
                        error = %err,
                        "session file unparseable, reinitializing"
                    );
                    let document = StoreDocument::default();
                    self.write_document(&document)?;
                    Ok(document)
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let document = StoreDocument::default();
                self.write_document(&document)?;
                Ok(document)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_document(&self, document: &StoreDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        let tmp = self.temp_path();

        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        // Ensure data is persisted to disk before the rename makes it visible
        file.sync_all()?;
        fs::rename(&tmp, &self.inner.path)?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut os = self.inner.path.as_os_str().to_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

impl Clone for FileStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("sessions.json")).unwrap();
        (dir, store)
    }

    fn snapshot(id: &str, lifetime: u64) -> SessionSnapshot {
        SessionSnapshot {
            id: id.to_string(),
            data: Map::new(),
            lifetime,
        }
    }

    #[test]
    fn test_open_initializes_missing_file() {
        let (_dir, store) = temp_store();
        assert!(store.path().exists());

        let document = store.load().unwrap();
        assert!(document.sessions.is_empty());
    }

    #[test]
    fn test_upsert_appends_then_replaces_in_place() {
        let (_dir, store) = temp_store();

        store.upsert(&snapshot("a", 10)).unwrap();
        store.upsert(&snapshot("b", 10)).unwrap();
        store.upsert(&snapshot("c", 10)).unwrap();

        // Update the middle entry; its position must not change.
        let mut updated = snapshot("b", 9);
        updated.data.insert("role".to_string(), json!("admin"));
        store.upsert(&updated).unwrap();

        let document = store.load().unwrap();
        let ids: Vec<&str> = document.sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(document.sessions[1], updated);
    }

    #[test]
    fn test_remove_filters_by_id() {
        let (_dir, store) = temp_store();

        store.upsert(&snapshot("a", 10)).unwrap();
        store.upsert(&snapshot("b", 10)).unwrap();

        store.remove("a").unwrap();

        let document = store.load().unwrap();
        assert_eq!(document.sessions.len(), 1);
        assert_eq!(document.sessions[0].id, "b");

        // Removing an id that is not persisted is not an error.
        store.remove("a").unwrap();
    }

    #[test]
    fn test_contains() {
        let (_dir, store) = temp_store();
        store.upsert(&snapshot("a", 10)).unwrap();

        assert!(store.contains("a").unwrap());
        assert!(!store.contains("b").unwrap());
    }

    #[test]
    fn test_corrupt_file_heals_to_empty_document() {
        let (_dir, store) = temp_store();
        store.upsert(&snapshot("a", 10)).unwrap();

        fs::write(store.path(), "not valid json {{{").unwrap();

        let document = store.load().unwrap();
        assert!(document.sessions.is_empty());

        // The file itself was rewritten as the empty document.
        let text = fs::read_to_string(store.path()).unwrap();
        let reread: StoreDocument = serde_json::from_str(&text).unwrap();
        assert!(reread.sessions.is_empty());
    }

    #[test]
    fn test_deleted_file_heals_to_empty_document() {
        let (_dir, store) = temp_store();
        store.upsert(&snapshot("a", 10)).unwrap();

        fs::remove_file(store.path()).unwrap();

        let document = store.load().unwrap();
        assert!(document.sessions.is_empty());
        assert!(store.path().exists());
    }
}
