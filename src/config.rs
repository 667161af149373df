//! Server configuration read from command line flags and environment variables.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use time::Duration;

use crate::PasswordHash;

/// The placeholder JWT secret used when none is configured.
///
/// Tokens signed with this secret can be forged by anyone who has read this
/// source code, so the server logs a warning on start-up when it is in use.
pub const DEFAULT_JWT_SECRET: &str = "DEFAULT_SECRET";

/// The environment the server is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    /// Local development. Error responses include internal details.
    #[default]
    Development,
    /// Production. Error responses never include internal details.
    Production,
    /// Automated tests.
    Test,
}

/// The REST API server for the finance tracker.
///
/// Every flag can also be set through the environment variable listed in its help text.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Path to the application SQLite database, e.g. `finance.db` or `sqlite://finance.db`.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// The secret used to sign and verify bearer tokens.
    #[arg(long, env = "JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// How long a bearer token stays valid after log in, in hours.
    #[arg(long, env = "JWT_EXPIRY_HOURS", default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    pub jwt_expiry_hours: u32,

    /// The bcrypt cost factor used when hashing passwords.
    #[arg(long, env = "BCRYPT_SALT_ROUNDS", default_value_t = PasswordHash::DEFAULT_COST, value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    /// The environment the server is running in.
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// Directory containing an SSL certificate `cert.pem` and key `key.pem`. Serves plain HTTP when omitted.
    #[arg(long, env = "CERT_PATH")]
    pub cert_path: Option<PathBuf>,

    /// Directory of a built single-page client to serve for all non-API paths.
    #[arg(long, env = "CLIENT_DIR")]
    pub client_dir: Option<PathBuf>,
}

impl Config {
    /// How long a bearer token stays valid after log in.
    pub fn token_duration(&self) -> Duration {
        Duration::hours(i64::from(self.jwt_expiry_hours))
    }

    /// Whether the JWT secret is still the insecure placeholder.
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
