//! The session record: identifier, scoped data, and remaining lifetime.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::file_store::{FileStore, SessionSnapshot};
use crate::id;
use crate::registry::{Registry, WeakRegistry};

/// Lifecycle phase of a session record.
///
/// A session is constructed `Unassigned`, becomes `Active` when its
/// identifier is assigned (exactly once, during construction), and ends
/// `Destroyed` on explicit destroy or lifetime exhaustion. `Destroyed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unassigned,
    Active,
    Destroyed,
}

struct SessionState {
    id: String,
    data: Map<String, Value>,
    lifetime: u64,
    phase: Phase,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            data: self.data.clone(),
            lifetime: self.lifetime,
        }
    }
}

struct SessionInner {
    state: Mutex<SessionState>,
    file: FileStore,
    registry: WeakRegistry,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Lifetime was decremented and the snapshot persisted.
    Ticking,
    /// Lifetime reached zero; the session was destroyed.
    Expired,
    /// The session was already destroyed; the ticker should exit.
    Stopped,
}

/// An identifier-keyed, TTL-bounded bundle of scoped data.
///
/// Cloning is cheap and yields a handle to the same record. Mutations
/// (`set`, `remove`) persist the record's snapshot into the backing file
/// synchronously before returning. Every operation on a destroyed session,
/// reads included, fails with [`SessionError::Destroyed`].
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a fresh session: empty data, the configured lifetime, and a
    /// newly assigned identifier, persisted and registered before return.
    pub(crate) fn create(file: FileStore, registry: &Registry, lifetime: u64) -> Result<Session> {
        let session = Session {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState {
                    id: String::new(),
                    data: Map::new(),
                    lifetime,
                    phase: Phase::Unassigned,
                }),
                file,
                registry: registry.downgrade(),
            }),
        };

        session.assign_id()?;
        registry.register(session.clone());

        Ok(session)
    }

    /// Rebuild a session from a persisted snapshot at store startup,
    /// reusing its identifier, data, and remaining lifetime.
    pub(crate) fn rehydrate(
        snapshot: SessionSnapshot,
        file: FileStore,
        registry: &Registry,
    ) -> Session {
        let session = Session {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState {
                    id: snapshot.id,
                    data: snapshot.data,
                    lifetime: snapshot.lifetime,
                    phase: Phase::Active,
                }),
                file,
                registry: registry.downgrade(),
            }),
        };

        registry.register(session.clone());
        session
    }

    /// Assign a fresh identifier to an unassigned session and persist it.
    ///
    /// This succeeds exactly once, during construction. Once the session is
    /// `Active` (or `Destroyed`) any further call fails with
    /// [`SessionError::AlreadyAssigned`].
    pub fn assign_id(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.phase != Phase::Unassigned {
            return Err(SessionError::AlreadyAssigned);
        }

        let assigned = id::generate_unique(&self.inner.file)?;
        state.id = assigned;
        state.phase = Phase::Active;

        debug!(session_id = %state.id, lifetime = state.lifetime, "session created");
        self.inner.file.upsert(&state.snapshot())
    }

    /// Set a data field and persist the updated snapshot.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let mut state = self.lock_live()?;
        state.data.insert(key.into(), value);
        self.inner.file.upsert(&state.snapshot())
    }

    /// Read a data field from memory. Never touches the backing file.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let state = self.lock_live()?;
        Ok(state.data.get(key).cloned())
    }

    /// Remove a data field and persist. Absent keys are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.lock_live()?;
        state.data.remove(key);
        self.inner.file.upsert(&state.snapshot())
    }

    /// Snapshot of all current data fields.
    pub fn properties(&self) -> Result<Map<String, Value>> {
        Ok(self.lock_live()?.data.clone())
    }

    /// The session's identifier.
    pub fn id(&self) -> Result<String> {
        Ok(self.lock_live()?.id.clone())
    }

    /// Remaining lifetime in seconds.
    pub fn lifetime(&self) -> Result<u64> {
        Ok(self.lock_live()?.lifetime)
    }

    /// Destroy the session: remove its persisted entry, clear its data, and
    /// deregister it. Terminal; every later operation fails with
    /// [`SessionError::Destroyed`].
    pub fn destroy(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Destroyed {
            return Err(SessionError::Destroyed(state.id.clone()));
        }

        let destroyed_id = self.destroy_locked(&mut state)?;
        drop(state);

        self.inner.registry.deregister(&destroyed_id);
        debug!(session_id = %destroyed_id, "session destroyed");
        Ok(())
    }

    /// One countdown tick: decrement the lifetime and persist, destroying
    /// the session when it reaches zero.
    pub(crate) fn tick(&self) -> Result<Tick> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Destroyed {
            return Ok(Tick::Stopped);
        }

        state.lifetime = state.lifetime.saturating_sub(1);
        if state.lifetime == 0 {
            let destroyed_id = self.destroy_locked(&mut state)?;
            drop(state);

            self.inner.registry.deregister(&destroyed_id);
            debug!(session_id = %destroyed_id, "session lifetime exhausted");
            return Ok(Tick::Expired);
        }

        self.inner.file.upsert(&state.snapshot())?;
        Ok(Tick::Ticking)
    }

    /// Snapshot of the session if it is still live; `None` once destroyed.
    pub(crate) fn snapshot_if_live(&self) -> Option<SessionSnapshot> {
        let state = self.inner.state.lock();
        (state.phase != Phase::Destroyed).then(|| state.snapshot())
    }

    pub(crate) fn has_id(&self, id: &str) -> bool {
        self.inner.state.lock().id == id
    }

    /// Remove the persisted entry and clear in-memory data while holding
    /// the state lock, so a concurrent tick cannot write the entry back.
    fn destroy_locked(&self, state: &mut SessionState) -> Result<String> {
        let destroyed_id = state.id.clone();
        self.inner.file.remove(&destroyed_id)?;
        state.data.clear();
        state.phase = Phase::Destroyed;
        Ok(destroyed_id)
    }

    fn lock_live(&self) -> Result<MutexGuard<'_, SessionState>> {
        let state = self.inner.state.lock();
        if state.phase == Phase::Destroyed {
            return Err(SessionError::Destroyed(state.id.clone()));
        }
        Ok(state)
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Session")
            .field("id", &state.id)
            .field("lifetime", &state.lifetime)
            .field("phase", &state.phase)
            .finish()
    }
}
