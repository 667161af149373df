//! Defines the app level error type and its conversion to JSON error responses.
//!
//! Every error is rendered as `{"status": "error", "statusCode": ..., "message": ...}`.
//! Validation errors also carry an `errors` array with one entry per failing field.
//! [error_detail_middleware] adds a `stack` field with the internal error details
//! when the server is not running in production.

use std::any::Any;

use axum::{
    Json,
    body::Body,
    extract::{Request, State, rejection::JsonRejection},
    http::{StatusCode, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::Environment;

/// A validation failure for a single field of a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The name of the field as it appears in the request body.
    pub field: String,
    /// A human readable explanation of what is wrong with the field.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// The operation that was attempted on a transaction that could not be found.
///
/// Only changes the wording of the 404 message, a transaction owned by
/// another user is reported exactly like one that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    /// Reading a single transaction.
    View,
    /// Updating a transaction.
    Update,
    /// Deleting a transaction.
    Delete,
}

impl TransactionAction {
    fn not_found_message(&self) -> &'static str {
        match self {
            TransactionAction::View => "Transaction not found",
            TransactionAction::Update => "Transaction not found or not authorized to update",
            TransactionAction::Delete => "Transaction not found or not authorized to delete",
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of the request body failed validation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// The request body could not be parsed as JSON of the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The transaction ID in the URL path is not an integer.
    #[error("Invalid transaction ID")]
    InvalidTransactionId,

    /// A user with the same (normalised) email address already exists.
    #[error("User already exists with this email")]
    DuplicateEmail,

    /// The email does not belong to a user or the password is wrong.
    ///
    /// Both cases share this variant so that clients cannot tell whether an
    /// account exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request has no `Authorization: Bearer <token>` header.
    #[error("Not authorized, no token provided")]
    MissingToken,

    /// The bearer token is malformed, has a bad signature or has expired.
    #[error("Not authorized, token failed")]
    InvalidToken,

    /// The transaction does not exist or belongs to another user.
    #[error("{}", .0.not_found_message())]
    TransactionNotFound(TransactionAction),

    /// The user referenced by a valid token no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// No route matches the request path.
    #[error("Not found - {0}")]
    RouteNotFound(String),

    /// The path exists but does not accept the request method.
    #[error("Method not allowed - {0}")]
    MethodNotAllowed(String),

    /// A query returned no rows.
    ///
    /// Route handlers should convert this into a more specific not found
    /// error before it reaches the client.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The token for a successful log in could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A route handler panicked.
    #[error("a route handler panicked: {0}")]
    Panic(String),
}

impl Error {
    /// The HTTP status code that the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidBody(_)
            | Error::InvalidTransactionId
            | Error::DuplicateEmail => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::MissingToken | Error::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::TransactionNotFound(_)
            | Error::UserNotFound
            | Error::RouteNotFound(_)
            | Error::NotFound => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::SqlError(_)
            | Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::DatabaseLockError
            | Error::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client.
    ///
    /// Internal errors get a generic message; their details are logged and,
    /// outside of production, attached as the `stack` field.
    fn client_message(&self) -> String {
        if self.status_code().is_server_error() {
            "An unexpected error occurred.".to_owned()
        } else {
            self.to_string()
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.contains("user.email") => Error::DuplicateEmail,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidBody(rejection.body_text())
    }
}

/// The internal details of an error, attached to the response extensions so
/// that [error_detail_middleware] can expose them outside of production.
#[derive(Debug, Clone)]
pub struct ErrorStack(pub String);

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        let mut body = json!({
            "status": "error",
            "statusCode": status_code.as_u16(),
            "message": self.client_message(),
        });

        if let Error::Validation(errors) = &self {
            body["errors"] = json!(errors);
        }

        let mut response = (status_code, Json(body)).into_response();
        response
            .extensions_mut()
            .insert(ErrorStack(format!("{self:?}")));

        response
    }
}

/// Middleware that adds the internal error details as a `stack` field to
/// error responses when `environment` is not [Environment::Production].
///
/// Responses that were not produced by [Error] are passed through untouched.
pub async fn error_detail_middleware(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if environment == Environment::Production {
        return response;
    }

    let Some(ErrorStack(stack)) = response.extensions().get::<ErrorStack>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read error response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = match serde_json::from_slice::<Value>(&body_bytes) {
        Ok(Value::Object(mut map)) => {
            map.insert("stack".to_owned(), Value::String(stack));
            Body::from(Value::Object(map).to_string())
        }
        _ => Body::from(body_bytes),
    };

    parts.headers.remove(CONTENT_LENGTH);

    Response::from_parts(parts, body)
}

/// Convert a panic caught by `tower_http::catch_panic::CatchPanicLayer` into a JSON 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "unknown panic payload".to_owned()
    };

    Error::Panic(details).into_response()
}
