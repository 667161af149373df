//! The route handler for logging in with an email and password.
//!
//! A successful log in returns a signed bearer token, see [crate::auth] for how
//! the token is checked on later requests.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::WithRejection;
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Email, Error, FieldError, UserID, auth::encode_token, db::lock_connection,
    user::get_user_by_email,
};

/// The state needed to perform a login.
#[derive(Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key for signing bearer tokens.
    pub encoding_key: EncodingKey,
    /// The duration for which bearer tokens are valid.
    pub token_duration: Duration,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            encoding_key: state.jwt_keys.encoding_key.clone(),
            token_duration: state.token_duration,
        }
    }
}

/// The raw data entered by the user in the log-in form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogInPayload {
    /// The email the user registered with.
    pub email: Option<String>,
    /// The plain text password.
    pub password: Option<String>,
}

impl LogInPayload {
    fn validate(self) -> Result<(Email, String), Error> {
        let mut errors = Vec::new();

        let email = match self.email.as_deref().map(Email::new) {
            Some(Ok(email)) => Some(email),
            _ => {
                errors.push(FieldError::new(
                    "email",
                    "Please provide a valid email address",
                ));
                None
            }
        };

        let password = match self.password {
            Some(password) if !password.is_empty() => Some(password),
            _ => {
                errors.push(FieldError::new("password", "Password is required"));
                None
            }
        };

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// The user details returned alongside a new token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    /// The user's ID.
    pub id: UserID,
    /// The user's email address.
    pub email: Email,
    /// The user's display name, if they gave one.
    pub name: Option<String>,
}

/// The response body for a successful log in.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogInResponse {
    /// A confirmation message.
    pub message: String,
    /// The bearer token for authenticating later requests.
    pub token: String,
    /// The user that logged in.
    pub user: UserSummary,
}

/// A route handler for logging in a user.
///
/// An unknown email and a wrong password both give the same
/// [Error::InvalidCredentials] response.
pub async fn post_log_in(
    State(state): State<LogInState>,
    WithRejection(Json(payload), _): WithRejection<Json<LogInPayload>, Error>,
) -> Result<Json<LogInResponse>, Error> {
    let (email, password) = payload.validate()?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    let is_password_valid = user.password_hash.verify(&password).map_err(|error| {
        tracing::error!("Error verifying password: {error}");
        Error::HashingError(error.to_string())
    })?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(
        user.id,
        &user.email,
        state.token_duration,
        &state.encoding_key,
    )?;

    Ok(Json(LogInResponse {
        message: "Login successful".to_owned(),
        token,
        user: UserSummary {
            id: user.id,
            email: user.email,
            name: user.name,
        },
    }))
}
