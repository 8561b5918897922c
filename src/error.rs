//! Unified error types for the client.

use std::fmt;

// ---------------------------------------------------------------------------
// ActionError
// ---------------------------------------------------------------------------

/// Error type returned by action handlers.
///
/// The client never inspects or rewraps it; callers get the original value
/// back through [`ActionError::into_handler_error`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors arising from action execution.
#[derive(Debug)]
pub enum ActionError {
    /// No action with this name is registered.
    NotFound(String),
    /// The handler ran and failed. Holds the handler's own error untouched.
    Handler(HandlerError),
    /// The handler did not finish within the configured timeout.
    TimedOut { name: String, after_secs: u64 },
}

impl ActionError {
    /// True for the "no such action" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Recover the handler's original error, if that is what this is.
    pub fn into_handler_error(self) -> Option<HandlerError> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "action not found: {name}"),
            // Handler errors display exactly as the handler produced them.
            Self::Handler(err) => write!(f, "{err}"),
            Self::TimedOut { name, after_secs } => {
                write!(f, "action `{name}` timed out after {after_secs}s")
            }
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventError
// ---------------------------------------------------------------------------

/// Diagnostics for protocol event payloads that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The raw text was not JSON at all.
    InvalidJson(String),
    /// The payload was JSON but not an object.
    NotAnObject,
    /// No string `type` tag.
    MissingType,
    /// A `type` tag this client does not understand.
    UnknownType(String),
    /// A required field is absent or has the wrong JSON type.
    MissingField {
        event_type: &'static str,
        field: &'static str,
    },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "invalid event json: {msg}"),
            Self::NotAnObject => write!(f, "event payload is not an object"),
            Self::MissingType => write!(f, "event payload has no string `type`"),
            Self::UnknownType(kind) => write!(f, "unknown event type `{kind}`"),
            Self::MissingField { event_type, field } => {
                write!(f, "{event_type} event is missing field `{field}`")
            }
        }
    }
}

impl std::error::Error for EventError {}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidJson(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct QuotaExceeded;

    impl fmt::Display for QuotaExceeded {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "quota exceeded")
        }
    }

    impl std::error::Error for QuotaExceeded {}

    #[test]
    fn action_error_not_found_display() {
        let e = ActionError::NotFound("search".into());
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "action not found: search");
    }

    #[test]
    fn handler_error_round_trips_unchanged() {
        let e = ActionError::Handler(Box::new(QuotaExceeded));
        assert!(!e.is_not_found());
        assert_eq!(e.to_string(), "quota exceeded");
        let inner = e.into_handler_error().expect("handler error");
        assert!(inner.downcast_ref::<QuotaExceeded>().is_some());
    }

    #[test]
    fn timed_out_is_not_a_handler_error() {
        let e = ActionError::TimedOut {
            name: "slow".into(),
            after_secs: 3,
        };
        assert_eq!(e.to_string(), "action `slow` timed out after 3s");
        assert!(e.into_handler_error().is_none());
    }

    #[test]
    fn event_error_display_variants() {
        assert_eq!(
            EventError::UnknownType("tool_magic".into()).to_string(),
            "unknown event type `tool_magic`"
        );
        assert_eq!(
            EventError::MissingField {
                event_type: "tool_delta",
                field: "delta"
            }
            .to_string(),
            "tool_delta event is missing field `delta`"
        );
    }

    #[test]
    fn event_error_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(EventError::from(err)
            .to_string()
            .starts_with("invalid event json:"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = ConfigError::from(io_err);
        let s = e.to_string();
        assert!(s.starts_with("io:"), "got: {s}");
        assert!(s.contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err: toml::de::Error = toml::from_str::<toml::Value>("x = [unclosed").unwrap_err();
        let e = ConfigError::from(toml_err);
        assert!(e.to_string().starts_with("toml:"));
    }

    #[test]
    fn config_error_invalid_message() {
        let e = ConfigError::Invalid("unknown context strategy".into());
        assert_eq!(e.to_string(), "invalid config: unknown context strategy");
    }
}
