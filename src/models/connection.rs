//! Connection-related data models.
//!
//! This module defines named connection descriptors, the provider kinds the
//! bundled drivers understand, and the connection and transaction states.

use serde::{Deserialize, Serialize};

/// Database backends supported by the bundled sqlx drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl ProviderKind {
    /// Parse provider kind from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Provider keys registered for this kind by default.
    pub fn provider_keys(&self) -> &'static [&'static str] {
        match self {
            Self::PostgreSQL => &["postgres", "postgresql"],
            Self::MySQL => &["mysql", "mariadb"],
            Self::SQLite => &["sqlite"],
        }
    }

    /// Get the display name for this provider kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A named connection configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    /// Key of the driver factory, e.g. "postgres", "mysql", "sqlite".
    #[serde(rename = "provider")]
    pub provider_key: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
}

impl ConnectionDescriptor {
    /// Create a new connection descriptor.
    pub fn new(
        name: impl Into<String>,
        provider_key: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Result<Self, ConnectionConfigError> {
        let name = name.into();
        let provider_key = provider_key.into();
        let connection_string = connection_string.into();

        if name.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ConnectionConfigError::InvalidName(name));
        }
        if provider_key.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyProvider(name));
        }
        if connection_string.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyConnectionString(name));
        }

        Ok(Self {
            name,
            provider_key,
            connection_string,
        })
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        mask_connection_string(&self.connection_string)
    }
}

/// Replace the password portion of a URL-style connection string with `****`.
pub fn mask_connection_string(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        let scheme_end = connection_string.find("://").map_or(0, |p| p + 3);
        if let Some(colon_pos) = connection_string[..at_pos].rfind(':') {
            if colon_pos >= scheme_end {
                let prefix = &connection_string[..colon_pos + 1];
                let suffix = &connection_string[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
    }
    connection_string.to_string()
}

/// Errors that can occur when creating a connection descriptor.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection name cannot be empty")]
    EmptyName,

    #[error("Connection name contains invalid characters: {0}")]
    InvalidName(String),

    #[error("Connection '{0}' has no provider")]
    EmptyProvider(String),

    #[error("Connection '{0}' has an empty connection string")]
    EmptyConnectionString(String),
}

/// Lifecycle state of a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Closed,
    Open,
    /// The driver reported a connectivity failure; reopen before use.
    Broken,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::Broken => write!(f, "broken"),
        }
    }
}

/// State of a transaction scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    /// Check if the transaction is still active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the transaction has ended (committed or rolled back).
    pub fn is_ended(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled back"),
        }
    }
}
