//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Validation of transaction request bodies
//! - Database functions for storing, querying, and managing transactions
//! - Route handlers for the `/api/transactions` endpoints
//!
//! Every query is scoped to the authenticated user, so a transaction owned by
//! someone else looks exactly like one that does not exist.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, Error, database_id::TransactionId};

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod payload;
mod view_endpoint;

pub use core::{Transaction, TransactionType, create_transaction_table};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use view_endpoint::{get_transaction_endpoint, get_transactions_endpoint};

#[cfg(test)]
pub use core::{create_transaction, get_transaction, get_transactions_for_user};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Parse the transaction ID from a URL path segment.
///
/// # Errors
/// Returns [Error::InvalidTransactionId] if `raw_id` is not an integer.
fn parse_transaction_id(raw_id: &str) -> Result<TransactionId, Error> {
    raw_id
        .parse()
        .map_err(|_| Error::InvalidTransactionId)
}
