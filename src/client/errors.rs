//! Error types for the data client
//!
//! Every request-level failure surfaces as a [`FetchError`]. Errors are
//! cloneable so a single failure can fan out to every subscriber of a
//! cached query without losing information.

/// Result alias used throughout the client.
pub type FetchResult<T> = Result<T, FetchError>;

/// Request-level error taxonomy.
///
/// `Network` covers transport failures before a response arrived, `Http`
/// carries the status and body of a non-2xx response, `Decode` is a
/// malformed response payload, `Validation` is client-side rejection of
/// an upload before any request is issued, and `Timeout` is a deadline
/// expiry (request timeout or import-processing deadline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Network(String),
    Http { status: u16, body: String },
    Decode(String),
    Validation(String),
    Timeout(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Http { status, body } => {
                write!(f, "HTTP {} error: {}", status, body)
            }
            FetchError::Decode(msg) => write!(f, "Response decode error: {}", msg),
            FetchError::Validation(msg) => write!(f, "Validation error: {}", msg),
            FetchError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create a transport-level error
    #[inline(always)]
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a non-2xx response error
    #[inline(always)]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a payload decode error
    #[inline(always)]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a client-side validation error
    #[inline(always)]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a deadline-expiry error
    #[inline(always)]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// HTTP status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
