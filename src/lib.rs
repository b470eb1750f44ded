//! Provider-agnostic database access.
//!
//! This library resolves named connections to driver-backed handles, scopes
//! work in transactions that clean up after themselves, populates plain
//! structs from result rows, and parses client sort expressions into
//! `ORDER BY` lists. PostgreSQL, MySQL and SQLite drivers are bundled.

pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod models;
pub mod sort;

pub use config::{Config, ConnectionSettings};
pub use db::{Connection, ConnectionResolver, ProviderRegistry, TransactionScope};
pub use error::{CoercionError, DbError, DbResult};
pub use mapping::{CoercionPolicy, Materialize, Materializer, NameMap};
pub use models::{ConnectionDescriptor, ConnectionState, DbValue, TransactionState};
pub use sort::{SortDirection, SortSpec, SortTerm};
