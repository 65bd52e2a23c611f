//! The in-memory set of loaded sessions and the filter query over it.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::session::Session;

/// Search criteria for [`Registry::find`].
///
/// A criteria with a data predicate matches a session only if every
/// specified key's current value is equal to the session's stored value;
/// an id, when present, must also match exactly. Empty criteria match
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct FindCriteria {
    id: Option<String>,
    data: Map<String, Value>,
}

impl FindCriteria {
    /// Create empty criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact identifier match.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Require a data field to equal the given value.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Whether the criteria constrain nothing.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.data.is_empty()
    }

    fn matches(&self, session: &Session) -> bool {
        let Some(snapshot) = session.snapshot_if_live() else {
            return false;
        };

        for (key, expected) in &self.data {
            if snapshot.data.get(key) != Some(expected) {
                return false;
            }
        }

        match &self.id {
            Some(id) => snapshot.id == *id,
            None => !self.data.is_empty(),
        }
    }
}

/// The set of sessions currently loaded in one store instance.
///
/// Owned by the store and shared with each session; nothing here is process
/// global, so independent stores in one process stay independent. Cloning
/// yields a handle to the same set.
pub struct Registry {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Filter the loaded sessions. Destroyed sessions never match.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<Session> {
        self.sessions
            .read()
            .iter()
            .filter(|session| criteria.matches(session))
            .cloned()
            .collect()
    }

    /// Look up a single session by identifier.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.find(&FindCriteria::new().with_id(id)).into_iter().next()
    }

    /// Number of loaded sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are loaded.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub(crate) fn register(&self, session: Session) {
        self.sessions.write().push(session);
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            sessions: Arc::downgrade(&self.sessions),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// Weak handle held by each session so destroy can deregister without
/// keeping the registry (and thereby itself) alive in a reference cycle.
pub(crate) struct WeakRegistry {
    sessions: Weak<RwLock<Vec<Session>>>,
}

impl WeakRegistry {
    pub(crate) fn deregister(&self, id: &str) {
        if let Some(sessions) = self.sessions.upgrade() {
            sessions.write().retain(|session| !session.has_id(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::FileStore;
    use serde_json::json;

    fn fixture() -> (tempfile::TempDir, FileStore, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let file = FileStore::open(dir.path().join("sessions.json")).unwrap();
        (dir, file, Registry::new())
    }

    #[test]
    fn test_find_by_data_field() {
        let (_dir, file, registry) = fixture();

        let admin = Session::create(file.clone(), &registry, 60).unwrap();
        admin.set("role", json!("admin")).unwrap();
        let user = Session::create(file, &registry, 60).unwrap();
        user.set("role", json!("user")).unwrap();

        let found = registry.find(&FindCriteria::new().with_field("role", json!("admin")));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().unwrap(), admin.id().unwrap());
    }

    #[test]
    fn test_find_by_id_alone() {
        let (_dir, file, registry) = fixture();

        let _first = Session::create(file.clone(), &registry, 60).unwrap();
        let second = Session::create(file, &registry, 60).unwrap();
        let id = second.id().unwrap();

        let found = registry.find(&FindCriteria::new().with_id(&id));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id().unwrap(), id);
    }

    #[test]
    fn test_find_id_and_data_must_both_match() {
        let (_dir, file, registry) = fixture();

        let admin = Session::create(file, &registry, 60).unwrap();
        admin.set("role", json!("admin")).unwrap();
        let id = admin.id().unwrap();

        // Conflicting data predicate excludes the session.
        let found = registry.find(
            &FindCriteria::new()
                .with_id(&id)
                .with_field("role", json!("user")),
        );
        assert!(found.is_empty());

        let found = registry.find(
            &FindCriteria::new()
                .with_id(&id)
                .with_field("role", json!("admin")),
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_find_requires_strict_value_equality() {
        let (_dir, file, registry) = fixture();

        let session = Session::create(file, &registry, 60).unwrap();
        session.set("count", json!(1)).unwrap();

        // "1" (string) must not match 1 (number).
        let found = registry.find(&FindCriteria::new().with_field("count", json!("1")));
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_missing_key_excludes_session() {
        let (_dir, file, registry) = fixture();

        let session = Session::create(file, &registry, 60).unwrap();
        session.set("role", json!("admin")).unwrap();

        let found = registry.find(&FindCriteria::new().with_field("team", json!("admin")));
        assert!(found.is_empty());
    }

    #[test]
    fn test_empty_criteria_match_nothing() {
        let (_dir, file, registry) = fixture();
        let _session = Session::create(file, &registry, 60).unwrap();

        assert!(registry.find(&FindCriteria::new()).is_empty());
    }

    #[test]
    fn test_destroyed_sessions_never_match() {
        let (_dir, file, registry) = fixture();

        let session = Session::create(file, &registry, 60).unwrap();
        let id = session.id().unwrap();
        session.destroy().unwrap();

        assert!(registry.find(&FindCriteria::new().with_id(&id)).is_empty());
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn test_get_by_id() {
        let (_dir, file, registry) = fixture();

        let session = Session::create(file, &registry, 60).unwrap();
        let id = session.id().unwrap();

        assert!(registry.get(&id).is_some());
        assert!(registry.get("unknown").is_none());
    }
}
