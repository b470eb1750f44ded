//! Driver dispatch macros for reducing code duplication.
//!
//! The bundled drivers use one concrete sqlx connection type per backend.
//! These macros expand the per-backend match arms at compile time so each
//! operation reads as a single block.

/// Macro for generating driver dispatch match arms.
///
/// Matches a `DriverConnection` (by value or by reference, following the
/// usual binding modes) and evaluates the arm for the active backend.
///
/// # Example
///
/// ```ignore
/// impl_driver_dispatch!(conn, {
///     MySql(c) => do_mysql(c),
///     Postgres(c) => do_postgres(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
macro_rules! impl_driver_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::driver::DriverConnection::$variant($c) => $body,
            )+
        }
    };
}

pub(crate) use impl_driver_dispatch;

#[cfg(test)]
mod tests {
    use crate::db::driver::DriverConnection;

    fn backend_name(conn: &DriverConnection) -> &'static str {
        impl_driver_dispatch!(conn, {
            MySql(_c) => "mysql",
            Postgres(_c) => "postgres",
            SQLite(_c) => "sqlite",
        })
    }

    #[test]
    fn test_dispatch_selects_sqlite_arm() {
        let runtime = crate::db::driver::driver_runtime().unwrap();
        let options: sqlx::sqlite::SqliteConnectOptions = "sqlite::memory:".parse().unwrap();
        let conn = runtime
            .block_on(sqlx::ConnectOptions::connect(&options))
            .unwrap();
        let conn = DriverConnection::SQLite(conn);
        assert_eq!(backend_name(&conn), "sqlite");
        let _guard = runtime.enter();
        drop(conn);
    }
}
