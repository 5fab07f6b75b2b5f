//! Error taxonomy of the CLI.
//!
//! Every failure a command can hit is a [`CliError`]. Remote failures are
//! wrapped by the operation wrappers, validation failures are raised by
//! [`crate::validate`] before any request leaves the process.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// The server could not be reached or rejected the credentials.
    #[error("Connection error!{0}")]
    Connection(String),

    /// A command needing a live connection ran without one.
    #[error("Not connected. Run `connect` first.")]
    NotConnected,

    /// Invalid command parameter.
    #[error("Invalid parameter '{name}': {message}")]
    Parameter {
        /// Offending parameter.
        name: String,
        /// Constraint that failed, with the accepted set when there is one.
        message: String,
    },

    /// Invalid field or collection schema.
    #[error("Schema error on field '{field}': {reason}")]
    Schema {
        /// Offending field.
        field: String,
        /// Constraint that failed.
        reason: String,
    },

    /// Index parameter not accepted by the index type.
    #[error("Invalid index parameter '{key}' for {index_type}, accepted: [{accepted}]")]
    IndexParam {
        /// Index algorithm.
        index_type: String,
        /// Offending key.
        key: String,
        /// Comma separated accepted keys.
        accepted: String,
    },

    /// The server rejected a well-formed request.
    #[error("{operation} error!{message}")]
    Remote {
        /// Operation name, e.g. `Create collection`.
        operation: String,
        /// Server message, verbatim.
        message: String,
    },

    /// A named entity does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Entity kind, e.g. `Collection`.
        kind: &'static str,
        /// Entity name.
        name: String,
    },

    /// Data handed to the formatter has an unsupported shape.
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The user aborted a prompt or declined a confirmation.
    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Builds a parameter error.
    pub fn parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Builds a schema error.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a client error raised by `operation`.
    ///
    /// Connection-level failures stay connection errors; everything else is a
    /// remote operation error carrying the server message verbatim.
    pub fn remote(operation: impl Into<String>, err: milvus_client::Error) -> Self {
        match err {
            milvus_client::Error::Connection(msg)
            | milvus_client::Error::Authentication(msg)
            | milvus_client::Error::Tls(msg) => Self::Connection(msg),
            milvus_client::Error::Server { message, .. } => Self::Remote {
                operation: operation.into(),
                message,
            },
            other => Self::Remote {
                operation: operation.into(),
                message: other.to_string(),
            },
        }
    }

    /// Taxonomy name of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) | Self::NotConnected => "ConnectionError",
            Self::Parameter { .. } => "ParameterError",
            Self::Schema { .. } => "SchemaError",
            Self::IndexParam { .. } => "IndexParamError",
            Self::Remote { .. } => "RemoteOperationError",
            Self::NotFound { .. } => "NotFoundError",
            Self::Format(_) => "FormatError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Process exit status for a one-shot command that ended with this error.
    ///
    /// A cancellation is not a failure and exits 0.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 0,
            _ => 1,
        }
    }

    /// Returns true for a user cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
