use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Environment, Transaction, build_router, endpoints, log_in::LogInResponse,
};

/// Create app state backed by an in-memory database with a cheap hash cost.
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "foobar")
        .expect("Could not create app state.")
        .with_hash_cost(4)
        .with_environment(Environment::Test)
}

/// Create a test server for the full application router.
pub(crate) fn get_test_server() -> (TestServer, AppState) {
    let state = get_test_app_state();
    let app = build_router(state.clone(), None);

    (
        TestServer::try_new(app).expect("Could not create test server."),
        state,
    )
}

/// Register a user with `email` and the password "hunter2", log in and return the bearer token.
pub(crate) async fn register_and_log_in(server: &TestServer, email: &str) -> String {
    server
        .post(endpoints::REGISTER)
        .json(&json!({"email": email, "password": "hunter2"}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({"email": email, "password": "hunter2"}))
        .await;
    response.assert_status_ok();

    response.json::<LogInResponse>().token
}

/// Create an expense of 4.50 dated 2024-01-01 with `description` for the user with `token`.
pub(crate) async fn create_test_transaction(
    server: &TestServer,
    token: &str,
    description: &str,
) -> Transaction {
    let response = server
        .post(endpoints::TRANSACTIONS)
        .authorization_bearer(token)
        .json(&json!({
            "description": description,
            "amount": 4.5,
            "type": "EXPENSE",
            "date": "2024-01-01",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    response.json::<Transaction>()
}
