//! Connection handle abstraction.
//!
//! A [`Connection`] is a single, driver-backed connection with an explicit
//! [`ConnectionState`]. Connections are created `Closed` by a
//! [`ProviderFactory`] and opened on demand, either by the caller or by a
//! transaction scope. Pooling, if any, is the driver's business.

use crate::db::cursor::RowCursor;
use crate::error::DbResult;
use crate::models::{ConnectionState, DbValue};

/// A blocking connection handle.
///
/// Implementations are owned by exactly one logical user at a time and are
/// not meant to be shared between concurrent operations.
pub trait Connection: Send {
    /// Provider key this connection was created for.
    fn provider_key(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Open the connection. Reopens a `Broken` connection.
    fn open(&mut self) -> DbResult<()>;

    /// Close the connection. Closing a connection that is not open is a no-op.
    fn close(&mut self) -> DbResult<()>;

    /// Begin a transaction on the open connection.
    fn begin(&mut self) -> DbResult<()>;

    /// Commit the current transaction.
    fn commit(&mut self) -> DbResult<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> DbResult<()>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[DbValue]) -> DbResult<u64>;

    /// Run a query and return a forward-only cursor over its rows.
    fn query(&mut self, sql: &str, params: &[DbValue]) -> DbResult<RowCursor>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn provider_key(&self) -> &str {
        (**self).provider_key()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn open(&mut self) -> DbResult<()> {
        (**self).open()
    }

    fn close(&mut self) -> DbResult<()> {
        (**self).close()
    }

    fn begin(&mut self) -> DbResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> DbResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> DbResult<()> {
        (**self).rollback()
    }

    fn execute(&mut self, sql: &str, params: &[DbValue]) -> DbResult<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[DbValue]) -> DbResult<RowCursor> {
        (**self).query(sql, params)
    }
}

/// A driver factory: turns a connection string into a `Closed` handle.
pub trait ProviderFactory: Send + Sync {
    /// Create a new, not yet opened, connection.
    fn create_connection(&self, connection_string: &str) -> DbResult<Box<dyn Connection>>;
}
