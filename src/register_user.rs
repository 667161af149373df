//! The route handler for registering a new user account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Email, Error, FieldError, PasswordHash, ValidatedPassword,
    db::lock_connection,
    user::{NewUser, UserProfile, create_user},
};

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for the new user's password hash.
    pub hash_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            hash_cost: state.hash_cost,
        }
    }
}

/// The data for registering a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterPayload {
    /// The email to register with.
    pub email: Option<String>,
    /// The plain text password.
    pub password: Option<String>,
    /// An optional display name.
    pub name: Option<String>,
}

impl RegisterPayload {
    /// Check every field and collect all problems into a single validation error.
    fn validate(self) -> Result<(Email, ValidatedPassword, Option<String>), Error> {
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

        let password = match self.password.as_deref().map(ValidatedPassword::new) {
            Some(Ok(password)) => Some(password),
            Some(Err(error)) => {
                errors.push(FieldError::new("password", error.to_string()));
                None
            }
            None => {
                errors.push(FieldError::new(
                    "password",
                    "Password must be at least 6 characters long",
                ));
                None
            }
        };

        let name = self
            .name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok((email, password, name)),
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// The response body for a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// A confirmation message.
    pub message: String,
    /// The profile of the new user.
    pub user: UserProfile,
}

/// A route handler for creating a new user.
///
/// Responds with 201 and the new user's profile. The password hash is never returned.
pub async fn register_user(
    State(state): State<RegistrationState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterPayload>, Error>,
) -> Result<Response, Error> {
    let (email, password, name) = payload.validate()?;

    let password_hash = PasswordHash::new(password, state.hash_cost)?;

    let connection = lock_connection(&state.db_connection)?;
    let user = create_user(
        NewUser {
            email,
            password_hash,
            name,
        },
        &connection,
    )?;

    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_owned(),
            user: user.into(),
        }),
    )
        .into_response())
}
