//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;
use time::Duration;

use crate::{Config, Environment, Error, JwtKeys, PasswordHash, db::initialize};

/// How long a bearer token stays valid when no duration is configured.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::hours(24);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The keys for signing and verifying bearer tokens.
    pub jwt_keys: JwtKeys,

    /// The duration for which bearer tokens are valid.
    pub token_duration: Duration,

    /// The bcrypt cost used when hashing new passwords.
    pub hash_cost: u32,

    /// The environment the server is running in.
    pub environment: Environment,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// The token duration, hash cost and environment start at their defaults and can be
    /// changed with the `with_*` methods.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, jwt_secret: &str) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            db_connection: connection,
            jwt_keys: JwtKeys::new(jwt_secret),
            token_duration: DEFAULT_TOKEN_DURATION,
            hash_cost: PasswordHash::DEFAULT_COST,
            environment: Environment::default(),
        })
    }

    /// Create a new [AppState] using the settings in `config`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn from_config(db_connection: Connection, config: &Config) -> Result<Self, Error> {
        Ok(Self::new(db_connection, &config.jwt_secret)?
            .with_token_duration(config.token_duration())
            .with_hash_cost(config.bcrypt_cost)
            .with_environment(config.environment))
    }

    /// Set how long bearer tokens stay valid.
    pub fn with_token_duration(mut self, token_duration: Duration) -> Self {
        self.token_duration = token_duration;
        self
    }

    /// Set the bcrypt cost for new password hashes.
    pub fn with_hash_cost(mut self, hash_cost: u32) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    /// Set the environment, which controls whether error responses include internal details.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

impl FromRef<AppState> for Environment {
    fn from_ref(state: &AppState) -> Self {
        state.environment
    }
}
