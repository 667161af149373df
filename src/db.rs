//! Opening and initialising the application's SQLite database.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, transaction::create_transaction_table, user::create_user_table};

/// Strip the optional URL scheme from a database URL to get a SQLite path.
///
/// Accepts plain paths as well as `sqlite://`, `sqlite:` and `file:` prefixes.
fn database_path(database_url: &str) -> &str {
    ["sqlite://", "sqlite:", "file:"]
        .iter()
        .find_map(|prefix| database_url.strip_prefix(*prefix))
        .unwrap_or(database_url)
}

/// Open the SQLite database at `database_url`.
///
/// The special path `:memory:` opens a fresh in-memory database.
///
/// # Errors
/// Returns an error if the database file cannot be opened or created.
pub fn open_database(database_url: &str) -> Result<Connection, rusqlite::Error> {
    match database_path(database_url) {
        ":memory:" => Connection::open_in_memory(),
        path => Connection::open(path),
    }
}

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, so deleting a
/// user also deletes their transactions.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("Could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
