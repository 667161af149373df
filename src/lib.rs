//! Finance Tracker is a web API for recording personal income and expenses.
//!
//! Users register with an email and password, log in to receive a bearer
//! token, and then create, list, update and delete their own transactions.
//! Every transaction belongs to exactly one user and is only visible to that
//! user.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod config;
mod database_id;
mod db;
mod email;
mod endpoints;
mod error;
mod log_in;
mod logging;
mod password;
mod register_user;
mod routing;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{AuthenticatedUser, Claims, JwtKeys, decode_token, encode_token};
pub use config::{Config, DEFAULT_JWT_SECRET, Environment};
pub use database_id::{DatabaseId, TransactionId};
pub use db::{initialize as initialize_db, open_database};
pub use email::{Email, EmailAddressError};
pub use error::{Error, FieldError};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, PasswordTooShort, ValidatedPassword};
pub use routing::build_router;
pub use transaction::{Transaction, TransactionType};
pub use user::{User, UserID, UserProfile};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
