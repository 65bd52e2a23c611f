//! The frozen per-request session view.

use serde_json::{Map, Value};
use tracing::debug;

use ephemera_session::{Result, Session, SessionStore};

use crate::cookie::{SESSION_COOKIE, session_id_from_cookies};

/// A per-request view over one session.
///
/// Built once per request from the caller-supplied cookie header: the
/// carried identifier resolves to its loaded session, and a missing or
/// unmatched identifier yields a freshly created one. The view freezes
/// `id` and `lifetime` at attach time; data operations delegate to the
/// live session. The view itself performs no transport I/O; the caller
/// sends [`cookie`](RequestSession::cookie) back however its transport
/// requires.
pub struct RequestSession {
    session: Session,
    id: String,
    lifetime: u64,
    fresh: bool,
}

impl RequestSession {
    /// Resolve the request's session from an optional cookie header,
    /// creating a new session when the header carries no usable identifier.
    pub fn attach(store: &SessionStore, cookie_header: Option<&str>) -> Result<Self> {
        let carried = cookie_header.and_then(session_id_from_cookies);

        let (session, fresh) = match carried.and_then(|id| store.get(&id)) {
            Some(session) => (session, false),
            None => {
                let session = store.create_session()?;
                debug!(session_id = %session.id()?, "created session for request");
                (session, true)
            }
        };

        let id = session.id()?;
        let lifetime = session.lifetime()?;

        Ok(Self {
            session,
            id,
            lifetime,
            fresh,
        })
    }

    /// The session identifier, as of attach time.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remaining lifetime in seconds, as of attach time.
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Whether the session was created for this request. Fresh sessions
    /// need their cookie communicated back to the caller.
    pub fn is_new(&self) -> bool {
        self.fresh
    }

    /// The `sessid=<id>` cookie pair to send back to the caller.
    pub fn cookie(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.id)
    }

    /// Set a data field on the underlying session.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.session.set(key, value)
    }

    /// Read a data field from the underlying session.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.session.get(key)
    }

    /// Snapshot of all current data fields.
    pub fn properties(&self) -> Result<Map<String, Value>> {
        self.session.properties()
    }

    /// Delete a data field from the underlying session.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.session.remove(key)
    }

    /// Destroy the underlying session. Consumes the view; the caller
    /// should also clear its cookie.
    pub fn destroy(self) -> Result<()> {
        self.session.destroy()
    }
}
