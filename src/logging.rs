//! Middleware for logging requests and responses.
//!
//! Request headers are never logged since they carry the bearer token.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many characters are truncated in the `info` log.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body the middleware will buffer, matching axum's default body limit.
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024;

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// Requests with bodies over [MAX_REQUEST_BODY_SIZE] bytes are rejected with 413.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// `password` fields in JSON request bodies and `token` fields in JSON
/// response bodies are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_REQUEST_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let display_text = redact_json_field(&body_text(&body_bytes), "password");
    log_body(
        &format!("Received request: {} {}", parts.method, parts.uri),
        &display_text,
    );

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let display_text = redact_json_field(&body_text(&body_bytes), "token");
    log_body(&format!("Sending response: {}", parts.status), &display_text);

    Response::from_parts(parts, Body::from(body_bytes))
}

fn body_text(body_bytes: &Bytes) -> String {
    String::from_utf8_lossy(body_bytes).to_string()
}

/// Replace the value of the top-level `field_name` in a JSON object with asterisks.
///
/// Text that is not a JSON object, or does not have the field, is returned unchanged.
fn redact_json_field(body: &str, field_name: &str) -> String {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };

    match map.get_mut(field_name) {
        Some(value) => {
            *value = Value::String(REDACTED.to_owned());
            Value::Object(map).to_string()
        }
        None => body.to_owned(),
    }
}

/// Cut `body` down to [LOG_BODY_LENGTH_LIMIT] characters.
///
/// Returns `None` if the body is short enough to log in full.
fn truncate_body(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}

fn log_body(message: &str, body: &str) {
    match truncate_body(body) {
        Some(truncated) => {
            tracing::info!("{message}\nbody: {truncated}...");
            tracing::debug!("Full body: {body:?}");
        }
        None => tracing::info!("{message}\nbody: {body:?}"),
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, middleware, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::{
        LOG_BODY_LENGTH_LIMIT, MAX_REQUEST_BODY_SIZE, logging_middleware, redact_json_field,
        truncate_body,
    };

    #[test]
    fn redacts_password_field() {
        let body = r#"{"email":"foo@bar.baz","password":"hunter2"}"#;

        let redacted = redact_json_field(body, "password");

        assert!(!redacted.contains("hunter2"));
        let value: Value = serde_json::from_str(&redacted).unwrap();
        assert_eq!(value["password"], "********");
        assert_eq!(value["email"], "foo@bar.baz");
    }

    #[test]
    fn leaves_body_without_field_unchanged() {
        let body = r#"{"email":"foo@bar.baz"}"#;

        assert_eq!(redact_json_field(body, "password"), body);
        assert_eq!(redact_json_field("not json", "password"), "not json");
    }

    #[test]
    fn short_body_is_not_truncated() {
        assert_eq!(truncate_body("short"), None);
        assert_eq!(truncate_body(&"a".repeat(LOG_BODY_LENGTH_LIMIT)), None);
    }

    #[test]
    fn long_body_is_truncated_on_char_boundary() {
        let body = "é".repeat(LOG_BODY_LENGTH_LIMIT + 10);

        let truncated = truncate_body(&body).expect("body should be truncated");

        assert_eq!(truncated.chars().count(), LOG_BODY_LENGTH_LIMIT);
    }

    async fn echo(Json(body): Json<Value>) -> Json<Value> {
        Json(body)
    }

    #[tokio::test]
    async fn middleware_passes_bodies_through_unchanged() {
        let app = Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let body = json!({"email": "foo@bar.baz", "password": "hunter2"});

        let response = server.post("/echo").json(&body).await;

        response.assert_status_ok();
        response.assert_json(&body);
    }

    #[tokio::test]
    async fn middleware_rejects_oversized_request_body() {
        let app = Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post("/echo")
            .text("a".repeat(MAX_REQUEST_BODY_SIZE + 1))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
