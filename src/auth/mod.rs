mod middleware;
mod token;

pub use middleware::{AuthenticatedUser, auth_guard};
pub use token::{Claims, JwtKeys, decode_token, encode_token};

#[cfg(test)]
pub(crate) use middleware::AuthState;
