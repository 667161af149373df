use axum::http::StatusCode;
use axum_test::TestResponse;
use serde_json::{Value, json};

/// Check that `response` is a JSON error with `status_code` and `message`.
#[track_caller]
pub(crate) fn assert_error_body(response: &TestResponse, status_code: StatusCode, message: &str) {
    response.assert_status(status_code);

    let body = response.json::<Value>();
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["statusCode"], json!(status_code.as_u16()));
    assert_eq!(body["message"], json!(message));
}
