//! Error types for the Milvus client.
//!
//! Every remote call returns [`Result`]. Callers are expected to wrap
//! [`Error`] into their own taxonomy rather than surface it verbatim.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`VectorService`](crate::VectorService) implementation.
#[derive(Error, Debug)]
pub enum Error {
    /// The server could not be reached.
    #[error("cannot reach server: {0}")]
    Connection(String),

    /// Credentials were rejected (HTTP 401/403 or server code 1800).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server rejected a well-formed request.
    #[error("{message} (code={code})")]
    Server {
        /// Server status code.
        code: i64,
        /// Server message, verbatim.
        message: String,
    },

    /// Transport failure after the connection was established.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// TLS material could not be loaded.
    #[error("tls setup failed: {0}")]
    Tls(String),

    /// The backend does not implement the operation.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Builds a server error.
    pub fn server(code: i64, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Returns true when the failure happened before the server answered.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Authentication(_) | Self::Tls(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display_keeps_message() {
        let err = Error::server(1100, "collection not found[collection=docs]");
        assert_eq!(
            err.to_string(),
            "collection not found[collection=docs] (code=1100)"
        );
    }

    #[test]
    fn test_is_connection() {
        assert!(Error::Connection("refused".into()).is_connection());
        assert!(Error::Authentication("bad token".into()).is_connection());
        assert!(!Error::server(1, "x").is_connection());
        assert!(!Error::Decode("x".into()).is_connection());
    }
}
