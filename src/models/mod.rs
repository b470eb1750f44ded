//! Data models shared by the access layer.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod value;

// Re-export commonly used types
pub use connection::{
    ConnectionConfigError, ConnectionDescriptor, ConnectionState, ProviderKind, TransactionState,
    mask_connection_string,
};
pub use value::DbValue;
