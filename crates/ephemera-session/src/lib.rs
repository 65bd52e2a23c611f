//! Ephemeral session records with per-record TTL countdown and flat-file
//! persistence.
//!
//! This crate provides the session lifecycle engine:
//! - collision-checked opaque identifier generation
//! - one countdown task per session, persisting every tick
//! - synchronized read-modify-write persistence to a single JSON document
//! - a registry with filter queries over the loaded sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use ephemera_session::{SessionStore, StoreConfig, FindCriteria};
//!
//! let config = StoreConfig::default()
//!     .with_lifetime(3600)
//!     .with_session_file("sessions.json");
//!
//! let store = SessionStore::open(config)?;
//! let session = store.create_session()?;
//! session.set("user", serde_json::json!("ada"))?;
//! ```

mod config;
mod error;
mod expiry;
mod file_store;
mod id;
mod registry;
mod session;
mod store;

pub use config::{
    DEFAULT_LIFETIME_SECS, DEFAULT_SESSION_FILE, DEFAULT_TICK_INTERVAL, StoreConfig,
};
pub use error::{Result, SessionError};
pub use file_store::{FileStore, SessionSnapshot, StoreDocument};
pub use id::ID_LEN;
pub use registry::{FindCriteria, Registry};
pub use session::Session;
pub use store::SessionStore;
