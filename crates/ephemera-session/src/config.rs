//! Configuration for the session store.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Result, SessionError};

/// Default lifetime for new sessions, in seconds (one day).
pub const DEFAULT_LIFETIME_SECS: u64 = 86_400;

/// Default backing file for persisted sessions.
pub const DEFAULT_SESSION_FILE: &str = "sessions.json";

/// Default countdown tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Lifetime granted to newly created sessions, in seconds.
    pub lifetime: u64,

    /// Path of the backing session file.
    pub sessfile: PathBuf,

    /// Interval between countdown ticks. Every tick decrements each live
    /// session's lifetime by one and persists it.
    pub tick_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME_SECS,
            sessfile: PathBuf::from(DEFAULT_SESSION_FILE),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lifetime granted to new sessions, in seconds.
    pub fn with_lifetime(mut self, secs: u64) -> Self {
        self.lifetime = secs;
        self
    }

    /// Set the path of the backing session file.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sessfile = path.into();
        self
    }

    /// Set the countdown tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set an option by name from an open-typed value.
    ///
    /// Accepts `"lifetime"` (unsigned integer seconds) and `"sessfile"`
    /// (string path). A value whose type disagrees with the option fails
    /// with [`SessionError::ConfigTypeMismatch`] and leaves the prior value
    /// unchanged.
    pub fn configure(&mut self, option: &str, value: Value) -> Result<()> {
        match option {
            "lifetime" => match value.as_u64() {
                Some(secs) => {
                    self.lifetime = secs;
                    Ok(())
                }
                None => Err(SessionError::ConfigTypeMismatch {
                    option: option.to_string(),
                    expected: "unsigned integer",
                    found: json_type(&value),
                }),
            },
            "sessfile" => match value {
                Value::String(path) => {
                    self.sessfile = PathBuf::from(path);
                    Ok(())
                }
                other => Err(SessionError::ConfigTypeMismatch {
                    option: option.to_string(),
                    expected: "string",
                    found: json_type(&other),
                }),
            },
            other => Err(SessionError::UnknownOption(other.to_string())),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new();
        assert_eq!(config.lifetime, DEFAULT_LIFETIME_SECS);
        assert_eq!(config.sessfile, PathBuf::from(DEFAULT_SESSION_FILE));
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_lifetime(60)
            .with_session_file("/tmp/sessions.json")
            .with_tick_interval(Duration::from_millis(100));

        assert_eq!(config.lifetime, 60);
        assert_eq!(config.sessfile, PathBuf::from("/tmp/sessions.json"));
        assert_eq!(config.tick_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_configure_accepts_matching_types() {
        let mut config = StoreConfig::new();

        config.configure("lifetime", json!(120)).unwrap();
        assert_eq!(config.lifetime, 120);

        config.configure("sessfile", json!("other.json")).unwrap();
        assert_eq!(config.sessfile, PathBuf::from("other.json"));
    }

    #[test]
    fn test_configure_rejects_mismatched_lifetime() {
        let mut config = StoreConfig::new().with_lifetime(60);

        let err = config
            .configure("lifetime", json!("not-a-number"))
            .unwrap_err();
        assert!(matches!(err, SessionError::ConfigTypeMismatch { .. }));

        // Prior value retained.
        assert_eq!(config.lifetime, 60);
    }

    #[test]
    fn test_configure_rejects_fractional_lifetime() {
        let mut config = StoreConfig::new();
        let err = config.configure("lifetime", json!(1.5)).unwrap_err();
        assert!(matches!(err, SessionError::ConfigTypeMismatch { .. }));
    }

    #[test]
    fn test_configure_rejects_mismatched_sessfile() {
        let mut config = StoreConfig::new();

        let err = config.configure("sessfile", json!(42)).unwrap_err();
        assert!(matches!(err, SessionError::ConfigTypeMismatch { .. }));
        assert_eq!(config.sessfile, PathBuf::from(DEFAULT_SESSION_FILE));
    }

    #[test]
    fn test_configure_rejects_unknown_option() {
        let mut config = StoreConfig::new();
        let err = config.configure("nonsense", json!(true)).unwrap_err();
        assert!(matches!(err, SessionError::UnknownOption(_)));
    }
}
