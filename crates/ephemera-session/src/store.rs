//! Store facade: bootstraps the backing file, reloads persisted sessions,
//! and exposes creation and lookup as one API.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::expiry;
use crate::file_store::FileStore;
use crate::registry::{FindCriteria, Registry};
use crate::session::Session;

/// An ephemeral session store backed by one flat JSON file.
///
/// Opening a store loads every persisted session into memory and resumes
/// its countdown; creating a session persists it immediately. Stores are
/// self-contained: each owns its registry, so several stores with separate
/// backing files can coexist in one process.
///
/// [`open`](SessionStore::open) and
/// [`create_session`](SessionStore::create_session) spawn countdown tasks
/// and must be called from within a Tokio runtime.
pub struct SessionStore {
    config: StoreConfig,
    file: FileStore,
    registry: Registry,
    shutdown: watch::Sender<bool>,
}

impl SessionStore {
    /// Open the store: initialize the backing file if missing, self-heal it
    /// if corrupt, and rehydrate every persisted session.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let file = FileStore::open(&config.sessfile)?;
        let document = file.load()?;

        let store = Self {
            config,
            file,
            registry: Registry::new(),
            shutdown: watch::channel(false).0,
        };

        for snapshot in document.sessions {
            if snapshot.lifetime == 0 {
                warn!(session_id = %snapshot.id, "dropping persisted session with exhausted lifetime");
                store.file.remove(&snapshot.id)?;
                continue;
            }

            let session = Session::rehydrate(snapshot, store.file.clone(), &store.registry);
            expiry::spawn(
                session,
                store.config.tick_interval,
                store.shutdown.subscribe(),
            );
        }

        debug!(
            path = %store.config.sessfile.display(),
            sessions = store.registry.len(),
            "session store opened"
        );
        Ok(store)
    }

    /// Create a fresh session with empty data and the configured lifetime.
    /// The session is persisted, registered, and ticking before return.
    pub fn create_session(&self) -> Result<Session> {
        let session = Session::create(self.file.clone(), &self.registry, self.config.lifetime)?;
        expiry::spawn(
            session.clone(),
            self.config.tick_interval,
            self.shutdown.subscribe(),
        );
        Ok(session)
    }

    /// Filter the loaded sessions by identifier and/or data fields.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<Session> {
        self.registry.find(criteria)
    }

    /// Look up a single session by identifier.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.registry.get(id)
    }

    /// Number of loaded sessions.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no sessions are loaded.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Stop every outstanding countdown task without destroying sessions.
    ///
    /// Dropping the store has the same effect; this makes the teardown
    /// explicit. Sessions stay persisted and can be rehydrated by the next
    /// [`open`](SessionStore::open).
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
