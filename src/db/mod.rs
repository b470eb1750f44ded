//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection handles and driver factories
//! - Named connection resolution
//! - Transaction scopes
//! - Forward-only result cursors
//! - sqlx-backed drivers, parameter binding and type mappings
//! - Driver dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod params;
pub mod resolver;
pub mod transaction;
pub mod types;

pub use connection::{Connection, ProviderFactory};
pub use cursor::{ResultCursor, RowCursor, uuid_from_value};
pub use driver::{SqlxConnection, SqlxProvider, driver_runtime};
pub use resolver::{
    ConnectionResolver, DescriptorStore, ProviderRegistry, close_connection, open_connection,
};
pub use transaction::{ScopeOptions, TransactionScope, run_in_transaction};
pub use types::{RowToValues, TypeCategory, categorize_type};
