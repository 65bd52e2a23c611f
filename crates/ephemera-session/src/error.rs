//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Identifier assignment was attempted on a session that already has one.
    /// This is programmer error and is never retried.
    #[error("session already has an id")]
    AlreadyAssigned,

    /// An operation was invoked on a destroyed session.
    #[error("session {0} has been destroyed")]
    Destroyed(String),

    /// A configuration value's type does not match the option it targets.
    #[error("config option '{option}' expects {expected}, got {found}")]
    ConfigTypeMismatch {
        option: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The configuration option does not exist.
    #[error("unknown config option '{0}'")]
    UnknownOption(String),

    /// IO error from the backing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for the persisted document.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
