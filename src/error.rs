//! Error types for the database access layer.
//!
//! All fallible operations return [`DbResult`]. Configuration and connectivity
//! failures are always surfaced to the caller; member conversion failures are
//! reported through [`CoercionError`] and only become a [`DbError`] when the
//! materializer runs in strict mode.

use crate::models::{ConnectionConfigError, ConnectionState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection configuration not found: '{name}'")]
    ConnectionConfigNotFound { name: String },

    #[error("Provider '{provider}' is not supported (connection: {name})")]
    ProviderNotSupported { provider: String, name: String },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Cannot {operation}: connection is {state}")]
    InvalidState {
        operation: String,
        state: ConnectionState,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Failed to assign column '{column}' to member '{member}': {source}")]
    Coercion {
        member: String,
        column: String,
        #[source]
        source: CoercionError,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a named-lookup failure for a connection descriptor.
    pub fn config_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionConfigNotFound { name: name.into() }
    }

    /// Create an unsupported provider error.
    pub fn provider_not_supported(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ProviderNotSupported {
            provider: provider.into(),
            name: name.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an error for an operation attempted in the wrong connection state.
    pub fn invalid_state(operation: impl Into<String>, state: ConnectionState) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state,
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Wrap a member conversion failure.
    pub fn coercion(
        member: impl Into<String>,
        column: impl Into<String>,
        source: CoercionError,
    ) -> Self {
        Self::Coercion {
            member: member.into(),
            column: column.into(),
            source,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::ConnectionConfigNotFound { .. } => {
                Some("Check the configured connection names")
            }
            Self::ProviderNotSupported { .. } => {
                Some("Use one of the registered provider keys: postgres, mysql, sqlite")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this error is a configuration error (named lookup or provider).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConnectionConfigNotFound { .. }
                | Self::ProviderNotSupported { .. }
                | Self::Configuration { .. }
        )
    }
}

/// Descriptor validation failures are configuration errors.
impl From<ConnectionConfigError> for DbError {
    fn from(err: ConnectionConfigError) -> Self {
        DbError::configuration(err.to_string())
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out acquiring a connection",
                "Check the driver's timeout configuration",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection is closed", "Reopen the connection")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::internal(format!("Type not found: {}", type_name))
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::connection(
                "Database worker crashed",
                "Reopen the connection",
            ),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// A failure to convert a database value into a member's declared type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("cannot convert {found} value to {target}: {detail}")]
    Incompatible {
        target: &'static str,
        found: &'static str,
        detail: String,
    },

    #[error("member '{member}' is not writable")]
    NotWritable { member: String },

    #[error("no member named '{member}'")]
    UnknownMember { member: String },
}

impl CoercionError {
    /// Create an incompatible-value error.
    pub fn incompatible(
        target: &'static str,
        found: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::Incompatible {
            target,
            found,
            detail: detail.into(),
        }
    }

    /// Create a not-writable error.
    pub fn not_writable(member: impl Into<String>) -> Self {
        Self::NotWritable {
            member: member.into(),
        }
    }

    /// Create an unknown-member error.
    pub fn unknown_member(member: impl Into<String>) -> Self {
        Self::UnknownMember {
            member: member.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_validation_maps_to_configuration() {
        let err: DbError = ConnectionConfigError::EmptyConnectionString("main".into()).into();
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("main"));
    }

    #[test]
    fn test_config_not_found_names_key() {
        let err = DbError::config_not_found("reporting");
        assert!(err.to_string().contains("reporting"));
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_not_supported_names_provider() {
        let err = DbError::provider_not_supported("oracle", "legacy");
        let msg = err.to_string();
        assert!(msg.contains("oracle"));
        assert!(msg.contains("legacy"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::transaction("failed").is_retryable());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = DbError::invalid_state("begin a transaction", ConnectionState::Closed);
        assert_eq!(
            err.to_string(),
            "Cannot begin a transaction: connection is closed"
        );
    }

    #[test]
    fn test_coercion_error_source() {
        use std::error::Error as _;

        let err = DbError::coercion(
            "age",
            "Age",
            CoercionError::incompatible("i32", "text", "invalid digit found in string"),
        );
        assert!(err.to_string().contains("member 'age'"));
        assert!(err.source().is_some());
    }
}
