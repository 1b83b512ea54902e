//! Error types for querykit

use thiserror::Error;

/// Result type alias for querykit operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Raw failure detail reported by the driver.
///
/// Carries the server's error unchanged: the SQLSTATE, the driver-specific
/// numeric code, and the message text. This is what `failed_because()`
/// reports after a failed prepare or execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Failure {
    /// Five-character SQLSTATE, when the driver supplied one.
    pub sqlstate: Option<String>,
    /// Driver-specific error code (e.g. `1045` for access denied).
    pub code: Option<u32>,
    /// Human-readable message from the driver.
    pub message: String,
}

impl Failure {
    /// Create a failure from a bare message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            sqlstate: None,
            code: None,
            message: message.into(),
        }
    }

    /// Create a failure with a driver code.
    pub fn with_code(message: impl Into<String>, code: u32) -> Self {
        Self {
            sqlstate: None,
            code: Some(code),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

/// A connection-establishment failure paired with a user-facing message.
///
/// `friendly` comes from a classification table of well-known low-level
/// codes; failures outside that table carry an empty friendly message
/// alongside the raw detail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectError {
    /// Human text for well-known failure classes; empty when unclassified.
    pub friendly: String,
    /// The raw driver failure.
    pub failure: Failure,
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.friendly.is_empty() {
            write!(f, "{}", self.failure)
        } else {
            write!(f, "{}: {}", self.friendly, self.failure)
        }
    }
}

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// Executed against a database handle that was never established.
    #[error("no connection established")]
    NoConnection,

    /// Required connect options are missing (host/username/schema).
    #[error("configuration error: {0}")]
    Config(String),

    /// Low-level failure while establishing the connection.
    #[error("connection failed: {0}")]
    Connect(ConnectError),

    /// The server rejected the statement at prepare time.
    #[error("prepare failed: {0}")]
    Prepare(Failure),

    /// The server rejected the statement at execution time.
    #[error("execution failed: {0}")]
    Execution(Failure),

    /// Result accessor called before a successful execution.
    #[error("no result available: {0}")]
    NoResult(&'static str),

    /// Value could not be serialized for binding.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl QueryError {
    /// The raw driver failure behind this error, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Connect(err) => Some(&err.failure),
            Self::Prepare(failure) | Self::Execution(failure) => Some(failure),
            _ => None,
        }
    }

    /// Check if this is the no-connection condition.
    pub fn is_no_connection(&self) -> bool {
        matches!(self, Self::NoConnection)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
