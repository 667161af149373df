//! Defines the endpoint for updating a transaction, shared by PUT and PATCH.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AuthenticatedUser, Error, UserID,
    database_id::TransactionId,
    db::lock_connection,
    error::TransactionAction,
    transaction::{
        Transaction, TransactionState,
        core::{TransactionChanges, map_transaction_row},
        parse_transaction_id,
        payload::TransactionPayload,
    },
};

/// A route handler for updating one of the caller's transactions.
///
/// Supplied fields overwrite the stored values and absent fields are kept.
/// Responds with 404 if the transaction does not exist or belongs to another user.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(raw_transaction_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<TransactionPayload>, Error>,
) -> Result<Json<Transaction>, Error> {
    let transaction_id = parse_transaction_id(&raw_transaction_id)?;
    let changes = payload.into_changes()?;

    let connection = lock_connection(&state.db_connection)?;

    match update_transaction(transaction_id, user.id, changes, &connection) {
        Ok(transaction) => Ok(Json(transaction)),
        Err(Error::NotFound) => Err(Error::TransactionNotFound(TransactionAction::Update)),
        Err(error) => Err(error),
    }
}

/// Apply `changes` to the transaction `id` if it is owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "UPDATE \"transaction\"
             SET description = COALESCE(?1, description),
                 amount = COALESCE(?2, amount),
                 type = COALESCE(?3, type),
                 date = COALESCE(?4, date),
                 updated_at = ?5
             WHERE id = ?6 AND user_id = ?7
             RETURNING id, description, amount, type, date, user_id, created_at, updated_at",
        )?
        .query_one(
            (
                changes.description,
                changes.amount,
                changes.kind,
                changes.date,
                OffsetDateTime::now_utc(),
                id,
                user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        Email, Error, PasswordHash, Transaction, TransactionType, UserID,
        db::initialize,
        endpoints::{self, format_endpoint},
        test_utils::{create_test_transaction, get_test_server, register_and_log_in},
        transaction::{core::TransactionChanges, create_transaction},
        user::{NewUser, create_user},
    };

    use super::update_transaction;

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user_id = create_user(
            NewUser {
                email: Email::new("foo@bar.baz").unwrap(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                name: None,
            },
            &conn,
        )
        .unwrap()
        .id;

        (conn, user_id)
    }

    #[test]
    fn update_overwrites_only_supplied_fields() {
        let (conn, user_id) = get_test_connection();
        let transaction = create_transaction(
            Transaction::build("Coffee", 4.5, TransactionType::Expense)
                .date(datetime!(2024-01-01 0:00 UTC)),
            user_id,
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            transaction.id,
            user_id,
            TransactionChanges {
                amount: Some(10.0),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.amount, 10.0);
        assert_eq!(updated.description, transaction.description);
        assert_eq!(updated.kind, transaction.kind);
        assert_eq!(updated.date, transaction.date);
        assert_eq!(updated.created_at, transaction.created_at);
        assert!(updated.updated_at >= transaction.updated_at);
    }

    #[test]
    fn update_fails_for_other_user() {
        let (conn, user_id) = get_test_connection();
        let transaction = create_transaction(
            Transaction::build("Coffee", 4.5, TransactionType::Expense),
            user_id,
            &conn,
        )
        .unwrap();

        let result = update_transaction(
            transaction.id,
            UserID::new(user_id.as_i64() + 1),
            TransactionChanges {
                amount: Some(10.0),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn put_and_patch_both_merge_fields() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;
        let transaction = create_test_transaction(&server, &token, "Coffee").await;
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        let response = server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({"description": "Flat white"}))
            .await;
        response.assert_status_ok();

        let response = server
            .patch(&path)
            .authorization_bearer(&token)
            .json(&json!({"type": "INCOME"}))
            .await;
        response.assert_status_ok();

        let updated = response.json::<Transaction>();
        assert_eq!(updated.description, "Flat white");
        assert_eq!(updated.kind, TransactionType::Income);
        assert_eq!(updated.amount, transaction.amount);
        assert_eq!(updated.date, transaction.date);
    }

    #[tokio::test]
    async fn edit_fails_with_invalid_type() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;
        let transaction = create_test_transaction(&server, &token, "Coffee").await;

        let response = server
            .patch(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .authorization_bearer(&token)
            .json(&json!({"type": "GIFT"}))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn edit_fails_for_missing_transaction() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;

        let response = server
            .patch(&format_endpoint(endpoints::TRANSACTION, 1337))
            .authorization_bearer(&token)
            .json(&json!({"amount": 10}))
            .await;

        response.assert_status_not_found();
        assert_eq!(
            response.json::<Value>()["message"],
            "Transaction not found or not authorized to update"
        );
    }
}
