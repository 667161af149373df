//! Defines the endpoint for deleting one of the caller's transactions.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AuthenticatedUser, Error, UserID,
    database_id::TransactionId,
    db::lock_connection,
    error::TransactionAction,
    transaction::{TransactionState, parse_transaction_id},
};

/// A route handler for deleting one of the caller's transactions.
///
/// Responds with 204 and an empty body on success, or 404 if the transaction
/// does not exist or belongs to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(raw_transaction_id): Path<String>,
) -> Result<StatusCode, Error> {
    let transaction_id = parse_transaction_id(&raw_transaction_id)?;

    let connection = lock_connection(&state.db_connection)?;

    match delete_transaction(transaction_id, user.id, &connection)? {
        0 => Err(Error::TransactionNotFound(TransactionAction::Delete)),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

type RowsAffected = usize;

fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
            &[(":id", &id), (":user_id", &user_id.as_i64())],
        )
        .map_err(|err| err.into())
}
