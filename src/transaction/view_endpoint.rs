//! Defines the endpoints for reading the caller's transactions.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    AuthenticatedUser, Error,
    db::lock_connection,
    error::TransactionAction,
    transaction::{
        Transaction, TransactionState,
        core::{get_transaction, get_transactions_for_user},
        parse_transaction_id,
    },
};

/// A route handler that lists all of the caller's transactions, newest first.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transactions_for_user(user.id, &connection).map(Json)
}

/// A route handler for getting a single transaction by its ID.
///
/// Responds with 404 if the transaction does not exist or belongs to another user.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(raw_transaction_id): Path<String>,
) -> Result<Json<Transaction>, Error> {
    let transaction_id = parse_transaction_id(&raw_transaction_id)?;

    let connection = lock_connection(&state.db_connection)?;

    match get_transaction(transaction_id, user.id, &connection) {
        Ok(transaction) => Ok(Json(transaction)),
        Err(Error::NotFound) => Err(Error::TransactionNotFound(TransactionAction::View)),
        Err(error) => Err(error),
    }
}
