//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use `format_endpoint` in tests.

#[cfg(test)]
use std::fmt::Display;

/// The root route which responds with a plain text banner.
pub const ROOT: &str = "/";
/// The liveness check.
pub const HEALTH: &str = "/api/health";
/// The route for creating a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for exchanging an email and password for a bearer token.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for getting the profile of the authenticated user.
pub const CURRENT_USER: &str = "/api/auth/me";
/// The route for listing and creating transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for reading, updating and deleting a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The prefix shared by all API routes.
pub const API_PREFIX: &str = "/api";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// ```ignore
/// assert_eq!(format_endpoint(TRANSACTION, 1), "/api/transactions/1");
/// ```
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
