//! Authentication middleware that checks the bearer token on protected routes.

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::DecodingKey;

use crate::{AppState, Email, Error, UserID, auth::decode_token};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key for verifying bearer tokens.
    pub decoding_key: DecodingKey,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.jwt_keys.decoding_key.clone(),
        }
    }
}

/// The identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /// The ID of the user making the request.
    pub id: UserID,
    /// The email of the user making the request.
    pub email: Email,
}

/// Middleware function that checks for a valid `Authorization: Bearer <token>` header.
///
/// The token's claims are placed into the request as an [AuthenticatedUser] and the request
/// executed normally if the token is valid, otherwise a 401 JSON error is returned.
/// The database is not consulted, so a token stays valid until it expires.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user): Extension<AuthenticatedUser>` to receive the user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if !has_bearer_scheme(&parts.headers) {
        return Error::MissingToken.into_response();
    }

    let bearer = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(_) => return Error::MissingToken.into_response(),
    };

    let claims = match decode_token(bearer.token(), &state.decoding_key) {
        Ok(claims) => claims,
        Err(error) => {
            tracing::warn!("Rejected bearer token: {error}");
            return Error::InvalidToken.into_response();
        }
    };

    parts.extensions.insert(AuthenticatedUser {
        id: claims.id,
        email: claims.email,
    });
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

/// Whether the `Authorization` header starts with the scheme `Bearer`, matched case-sensitively.
fn has_bearer_scheme(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "))
}
