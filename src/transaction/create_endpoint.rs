//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;

use crate::{
    AuthenticatedUser, Error,
    db::lock_connection,
    transaction::{TransactionState, core::create_transaction, payload::TransactionPayload},
};

/// A route handler for creating a new transaction owned by the caller.
///
/// Responds with 201 and the new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Json(payload), _): WithRejection<Json<TransactionPayload>, Error>,
) -> Result<Response, Error> {
    let builder = payload.into_builder()?;

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(builder, user.id, &connection)?;

    tracing::debug!(
        "User {} created transaction {}",
        transaction.user_id,
        transaction.id
    );

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}
