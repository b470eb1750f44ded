//! Transaction scopes.
//!
//! A [`TransactionScope`] wraps one connection and one transaction. It opens a
//! `Closed` connection on construction and then owns that implicit open: the
//! connection is closed again exactly once, when the scope commits, rolls
//! back, or is dropped. A scope that is dropped while still active rolls back,
//! so an early return or `?` never leaves a half-applied unit of work behind.
//!
//! ```ignore
//! let mut conn = resolver.resolve("main")?;
//! let mut scope = TransactionScope::begin(&mut conn)?;
//! scope.execute("UPDATE accounts SET balance = balance - ? WHERE id = ?", &[50.into(), 1.into()])?;
//! scope.execute("UPDATE accounts SET balance = balance + ? WHERE id = ?", &[50.into(), 2.into()])?;
//! scope.commit()?;
//! ```

use crate::db::connection::Connection;
use crate::db::cursor::RowCursor;
use crate::db::resolver::{close_connection, open_connection};
use crate::error::{DbError, DbResult};
use crate::models::{DbValue, TransactionState};
use tracing::{debug, info, warn};

/// Options for a transaction scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Swallow (and log) failures when closing an implicitly opened
    /// connection after a successful commit. Default: true
    pub suppress_close_errors: bool,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            suppress_close_errors: true,
        }
    }
}

/// A unit of work over one connection with rollback-on-abandon.
pub struct TransactionScope<'c, C: Connection + ?Sized> {
    connection: &'c mut C,
    state: TransactionState,
    /// Set when this scope opened the connection; cleared once it is closed.
    opened_connection: bool,
    options: ScopeOptions,
}

impl<'c, C: Connection + ?Sized> TransactionScope<'c, C> {
    /// Begin a transaction with default options.
    pub fn begin(connection: &'c mut C) -> DbResult<Self> {
        Self::begin_with(connection, ScopeOptions::default())
    }

    /// Begin a transaction, opening the connection first if needed.
    pub fn begin_with(connection: &'c mut C, options: ScopeOptions) -> DbResult<Self> {
        let opened_connection = open_connection(&mut *connection)?;

        if let Err(e) = connection.begin() {
            if opened_connection {
                let _ = close_connection(&mut *connection, true);
            }
            return Err(e);
        }

        info!(
            provider = %connection.provider_key(),
            implicit_open = opened_connection,
            "Transaction started"
        );

        Ok(Self {
            connection,
            state: TransactionState::Active,
            opened_connection,
            options,
        })
    }

    /// Current state of the scope.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether the transaction is still active.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether this scope opened the connection and still owns closing it.
    pub fn owns_connection_open(&self) -> bool {
        self.opened_connection
    }

    /// The wrapped connection, for running statements inside the transaction.
    pub fn connection(&mut self) -> &mut C {
        &mut *self.connection
    }

    /// Execute a statement inside the transaction.
    pub fn execute(&mut self, sql: &str, params: &[DbValue]) -> DbResult<u64> {
        self.ensure_active("execute")?;
        self.connection.execute(sql, params)
    }

    /// Run a query inside the transaction.
    pub fn query(&mut self, sql: &str, params: &[DbValue]) -> DbResult<RowCursor> {
        self.ensure_active("query")?;
        self.connection.query(sql, params)
    }

    /// Commit the transaction.
    ///
    /// Calling this after the scope already committed or rolled back is a
    /// no-op. If the driver rejects the commit the scope rolls back, releases
    /// its implicit open and returns the commit error.
    pub fn commit(&mut self) -> DbResult<()> {
        if self.state.is_ended() {
            debug!(state = %self.state, "Commit ignored: transaction already ended");
            return Ok(());
        }

        if let Err(e) = self.connection.commit() {
            warn!(error = %e, "Commit failed, rolling back");
            self.state = TransactionState::RolledBack;
            if let Err(rollback_err) = self.connection.rollback() {
                debug!(error = %rollback_err, "Rollback after failed commit also failed");
            }
            self.release_connection(true)?;
            return Err(e);
        }

        self.state = TransactionState::Committed;
        info!(provider = %self.connection.provider_key(), "Transaction committed");
        self.release_connection(self.options.suppress_close_errors)
    }

    /// Roll back the transaction.
    ///
    /// Calling this after the scope already committed or rolled back is a
    /// no-op. An implicitly opened connection is closed on a best-effort
    /// basis; the rollback's own failure is returned.
    pub fn rollback(&mut self) -> DbResult<()> {
        if self.state.is_ended() {
            debug!(state = %self.state, "Rollback ignored: transaction already ended");
            return Ok(());
        }

        self.state = TransactionState::RolledBack;
        let result = self.connection.rollback();
        self.release_connection(true)?;

        match &result {
            Ok(()) => info!(provider = %self.connection.provider_key(), "Transaction rolled back"),
            Err(e) => warn!(error = %e, "Rollback failed"),
        }
        result
    }

    fn ensure_active(&self, operation: &str) -> DbResult<()> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(DbError::transaction(format!(
                "Cannot {} after the transaction was {}",
                operation, self.state
            )))
        }
    }

    /// Close the connection if this scope opened it. Runs at most once.
    fn release_connection(&mut self, suppress_errors: bool) -> DbResult<()> {
        if !self.opened_connection {
            return Ok(());
        }
        self.opened_connection = false;
        close_connection(&mut *self.connection, suppress_errors)
    }
}

impl<C: Connection + ?Sized> Drop for TransactionScope<'_, C> {
    fn drop(&mut self) {
        if !self.state.is_active() {
            return;
        }

        warn!(
            provider = %self.connection.provider_key(),
            "Transaction scope dropped while active, rolling back"
        );
        if let Err(e) = self.rollback() {
            warn!(error = %e, "Automatic rollback failed");
        }
    }
}

impl<C: Connection + ?Sized> std::fmt::Debug for TransactionScope<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("provider", &self.connection.provider_key())
            .field("state", &self.state)
            .field("opened_connection", &self.opened_connection)
            .field("options", &self.options)
            .finish()
    }
}

/// Run `work` inside a transaction.
///
/// Commits when `work` returns `Ok`; otherwise the scope is dropped and rolls
/// back, and the work's error is returned.
pub fn run_in_transaction<C, T, F>(connection: &mut C, work: F) -> DbResult<T>
where
    C: Connection + ?Sized,
    F: FnOnce(&mut TransactionScope<'_, C>) -> DbResult<T>,
{
    let mut scope = TransactionScope::begin(connection)?;
    let value = work(&mut scope)?;
    scope.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionState;

    #[derive(Default)]
    struct ScriptedConnection {
        state: Option<ConnectionState>,
        log: Vec<&'static str>,
        fail_begin: bool,
        fail_commit: bool,
        fail_close: bool,
    }

    impl ScriptedConnection {
        fn closed() -> Self {
            Self {
                state: Some(ConnectionState::Closed),
                ..Default::default()
            }
        }

        fn open() -> Self {
            Self {
                state: Some(ConnectionState::Open),
                ..Default::default()
            }
        }

        fn broken() -> Self {
            Self {
                state: Some(ConnectionState::Broken),
                ..Default::default()
            }
        }
    }

    impl Connection for ScriptedConnection {
        fn provider_key(&self) -> &str {
            "scripted"
        }

        fn state(&self) -> ConnectionState {
            self.state.unwrap_or(ConnectionState::Closed)
        }

        fn open(&mut self) -> DbResult<()> {
            self.log.push("open");
            self.state = Some(ConnectionState::Open);
            Ok(())
        }

        fn close(&mut self) -> DbResult<()> {
            self.log.push("close");
            if self.fail_close {
                return Err(DbError::connection("close failed", "check the server"));
            }
            self.state = Some(ConnectionState::Closed);
            Ok(())
        }

        fn begin(&mut self) -> DbResult<()> {
            if self.fail_begin {
                return Err(DbError::connection("begin failed", "retry"));
            }
            self.log.push("begin");
            Ok(())
        }

        fn commit(&mut self) -> DbResult<()> {
            if self.fail_commit {
                return Err(DbError::database("serialization failure", None, "retry"));
            }
            self.log.push("commit");
            Ok(())
        }

        fn rollback(&mut self) -> DbResult<()> {
            self.log.push("rollback");
            Ok(())
        }

        fn execute(&mut self, _sql: &str, _params: &[DbValue]) -> DbResult<u64> {
            self.log.push("execute");
            Ok(1)
        }

        fn query(&mut self, _sql: &str, _params: &[DbValue]) -> DbResult<RowCursor> {
            Ok(RowCursor::default())
        }
    }

    #[test]
    fn test_commit_closes_implicitly_opened_connection() {
        let mut conn = ScriptedConnection::closed();
        {
            let mut scope = TransactionScope::begin(&mut conn).unwrap();
            assert!(scope.owns_connection_open());
            scope.commit().unwrap();
            assert_eq!(scope.state(), TransactionState::Committed);
            assert!(!scope.owns_connection_open());
        }
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.log, vec!["open", "begin", "commit", "close"]);
    }

    #[test]
    fn test_commit_leaves_preopened_connection_open() {
        let mut conn = ScriptedConnection::open();
        {
            let mut scope = TransactionScope::begin(&mut conn).unwrap();
            assert!(!scope.owns_connection_open());
            scope.commit().unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.log, vec!["begin", "commit"]);
    }

    #[test]
    fn test_revived_broken_connection_is_not_owned() {
        let mut conn = ScriptedConnection::broken();
        {
            let mut scope = TransactionScope::begin(&mut conn).unwrap();
            assert!(!scope.owns_connection_open());
            assert_eq!(scope.connection().state(), ConnectionState::Open);
            scope.commit().unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.log, vec!["open", "begin", "commit"]);

        let mut conn = ScriptedConnection::broken();
        {
            let mut scope = TransactionScope::begin(&mut conn).unwrap();
            assert!(!scope.owns_connection_open());
            scope.rollback().unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(conn.log, vec!["open", "begin", "rollback"]);
    }

    #[test]
    fn test_close_failure_after_commit_honors_options() {
        let mut conn = ScriptedConnection {
            fail_close: true,
            ..ScriptedConnection::closed()
        };
        let mut scope = TransactionScope::begin(&mut conn).unwrap();
        scope.commit().unwrap();
        assert_eq!(scope.state(), TransactionState::Committed);
        drop(scope);

        let mut conn = ScriptedConnection {
            fail_close: true,
            ..ScriptedConnection::closed()
        };
        let options = ScopeOptions {
            suppress_close_errors: false,
        };
        let mut scope = TransactionScope::begin_with(&mut conn, options).unwrap();
        let err = scope.commit().unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert_eq!(scope.state(), TransactionState::Committed);
        assert!(!scope.owns_connection_open());
        drop(scope);
        // Close is attempted exactly once
        assert_eq!(conn.log, vec!["open", "begin", "commit", "close"]);
    }

    #[test]
    fn test_drop_rolls_back_and_closes() {
        let mut conn = ScriptedConnection::closed();
        {
            let mut scope = TransactionScope::begin(&mut conn).unwrap();
            scope.execute("UPDATE t SET x = 1", &[]).unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.log, vec!["open", "begin", "execute", "rollback", "close"]);
    }

    #[test]
    fn test_commit_after_rollback_is_noop() {
        let mut conn = ScriptedConnection::open();
        let mut scope = TransactionScope::begin(&mut conn).unwrap();
        scope.rollback().unwrap();
        scope.commit().unwrap();
        assert_eq!(scope.state(), TransactionState::RolledBack);
        drop(scope);
        assert_eq!(conn.log, vec!["begin", "rollback"]);
    }

    #[test]
    fn test_second_commit_and_rollback_after_commit_are_noops() {
        let mut conn = ScriptedConnection::closed();
        let mut scope = TransactionScope::begin(&mut conn).unwrap();
        scope.commit().unwrap();
        scope.commit().unwrap();
        scope.rollback().unwrap();
        assert_eq!(scope.state(), TransactionState::Committed);
        drop(scope);
        assert_eq!(conn.log, vec!["open", "begin", "commit", "close"]);
    }

    #[test]
    fn test_execute_after_end_is_rejected() {
        let mut conn = ScriptedConnection::open();
        let mut scope = TransactionScope::begin(&mut conn).unwrap();
        scope.commit().unwrap();
        assert!(matches!(
            scope.execute("DELETE FROM t", &[]),
            Err(DbError::Transaction { .. })
        ));
    }

    #[test]
    fn test_failed_begin_closes_implicit_open() {
        let mut conn = ScriptedConnection {
            fail_begin: true,
            ..ScriptedConnection::closed()
        };
        assert!(TransactionScope::begin(&mut conn).is_err());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.log, vec!["open", "close"]);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let mut conn = ScriptedConnection {
            fail_commit: true,
            ..ScriptedConnection::closed()
        };
        let mut scope = TransactionScope::begin(&mut conn).unwrap();
        assert!(scope.commit().is_err());
        assert_eq!(scope.state(), TransactionState::RolledBack);
        drop(scope);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.log, vec!["open", "begin", "rollback", "close"]);
    }

    #[test]
    fn test_run_in_transaction_commits_on_ok() {
        let mut conn = ScriptedConnection::open();
        let affected =
            run_in_transaction(&mut conn, |scope| scope.execute("INSERT", &[])).unwrap();
        assert_eq!(affected, 1);
        assert_eq!(conn.log, vec!["begin", "execute", "commit"]);
    }

    #[test]
    fn test_run_in_transaction_rolls_back_on_err() {
        let mut conn = ScriptedConnection::open();
        let result: DbResult<()> = run_in_transaction(&mut conn, |scope| {
            scope.execute("INSERT", &[])?;
            Err(DbError::invalid_input("validation failed"))
        });
        assert!(result.is_err());
        assert_eq!(conn.log, vec!["begin", "execute", "rollback"]);
    }
}
