//! Application router configuration with protected and unprotected route definitions.

use std::path::Path;

use axum::{
    Json, Router,
    extract::Request,
    http::{Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

use crate::{
    AppState, Error,
    auth::auth_guard,
    endpoints,
    error::{error_detail_middleware, handle_panic},
    log_in::post_log_in,
    register_user::register_user,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_transaction_endpoint, get_transactions_endpoint,
    },
    user::get_current_user,
};

/// Return a router with all the app's routes.
///
/// When `client_dir` is given, paths outside of `/api` are served from that
/// directory with `index.html` as the fallback so client-side routes resolve.
pub fn build_router(state: AppState, client_dir: Option<&Path>) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in));

    let protected_routes = Router::new()
        .route(endpoints::CURRENT_USER, get(get_current_user))
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .patch(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let router = protected_routes.merge(unprotected_routes);

    let router = match client_dir {
        Some(client_dir) => {
            let client = ServeDir::new(client_dir)
                .fallback(ServeFile::new(client_dir.join("index.html")));

            router.fallback(move |request: Request| serve_client(client.clone(), request))
        }
        None => router.fallback(get_404_not_found),
    };

    router
        .method_not_allowed_fallback(get_405_method_not_allowed)
        .with_state(state.clone())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.environment,
            error_detail_middleware,
        ))
        .layer(CorsLayer::permissive())
}

/// The root path '/' responds with a plain text banner.
async fn get_root() -> &'static str {
    "Finance Tracker Backend API is running!"
}

/// A liveness check that does not touch the database.
async fn get_health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "UP",
        "timestamp": timestamp,
    }))
}

async fn get_404_not_found(uri: Uri) -> Error {
    Error::RouteNotFound(uri.to_string())
}

async fn get_405_method_not_allowed(method: Method, uri: Uri) -> Error {
    Error::MethodNotAllowed(format!("{method} {uri}"))
}

/// Serve a file from the client directory, or 404 for unknown API routes.
async fn serve_client(mut client: ServeDir<ServeFile>, request: Request) -> Response {
    let path = request.uri().path();

    if path == endpoints::API_PREFIX || path.starts_with(&format!("{}/", endpoints::API_PREFIX)) {
        return get_404_not_found(request.uri().clone()).await.into_response();
    }

    match client.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(error) => {
            tracing::error!("Could not serve client file: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}




#[cfg(test)]
mod end_to_end_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState, Environment, Transaction, UserProfile, build_router,
        endpoints::{self, format_endpoint},
        test_utils::{
            assert_error_body, create_test_transaction, get_test_server, register_and_log_in,
        },
    };

    #[tokio::test]
    async fn registering_same_email_twice_fails() {
        let (server, _) = get_test_server();
        let body = json!({"email": "foo@bar.baz", "password": "hunter2"});

        server
            .post(endpoints::REGISTER)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        let response = server.post(endpoints::REGISTER).json(&body).await;

        assert_error_body(
            &response,
            StatusCode::BAD_REQUEST,
            "User already exists with this email",
        );
    }

    #[tokio::test]
    async fn emails_differing_in_case_share_an_account() {
        let (server, _) = get_test_server();
        register_and_log_in(&server, "Foo@Bar.baz").await;

        server
            .post(endpoints::REGISTER)
            .json(&json!({"email": "FOO@BAR.BAZ", "password": "hunter2"}))
            .await
            .assert_status_bad_request();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "foo@bar.baz", "password": "hunter2"}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (server, _) = get_test_server();
        register_and_log_in(&server, "foo@bar.baz").await;

        let wrong_password = server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "foo@bar.baz", "password": "hunter3"}))
            .await;
        let unknown_email = server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "bar@bar.baz", "password": "hunter2"}))
            .await;

        assert_error_body(&wrong_password, StatusCode::UNAUTHORIZED, "Invalid credentials");
        assert_error_body(&unknown_email, StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    #[tokio::test]
    async fn current_user_returns_profile() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;

        let response = server
            .get(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let profile = response.json::<UserProfile>();
        assert_eq!(profile.email.as_ref(), "foo@bar.baz");
        assert!(!response.text().contains("password"));
    }

    #[tokio::test]
    async fn current_user_of_deleted_account_is_not_found() {
        let (server, state) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;
        state
            .db_connection
            .lock()
            .unwrap()
            .execute("DELETE FROM user", ())
            .unwrap();

        let response = server
            .get(endpoints::CURRENT_USER)
            .authorization_bearer(&token)
            .await;

        assert_error_body(&response, StatusCode::NOT_FOUND, "User not found");
    }

    #[tokio::test]
    async fn transaction_routes_require_token() {
        let (server, _) = get_test_server();
        let path = format_endpoint(endpoints::TRANSACTION, 1);

        let responses = [
            server.get(endpoints::TRANSACTIONS).await,
            server.post(endpoints::TRANSACTIONS).await,
            server.get(&path).await,
            server.put(&path).await,
            server.patch(&path).await,
            server.delete(&path).await,
        ];

        for response in responses {
            assert_error_body(
                &response,
                StatusCode::UNAUTHORIZED,
                "Not authorized, no token provided",
            );
        }
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let (server, _) = get_test_server();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer("not.a.token")
            .await;

        assert_error_body(&response, StatusCode::UNAUTHORIZED, "Not authorized, token failed");
    }

    #[tokio::test]
    async fn users_cannot_touch_each_others_transactions() {
        let (server, _) = get_test_server();
        let owner_token = register_and_log_in(&server, "foo@bar.baz").await;
        let other_token = register_and_log_in(&server, "bar@bar.baz").await;
        let transaction = create_test_transaction(&server, &owner_token, "Coffee").await;
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        let get_response = server.get(&path).authorization_bearer(&other_token).await;
        let put_response = server
            .put(&path)
            .authorization_bearer(&other_token)
            .json(&json!({"amount": 1}))
            .await;
        let delete_response = server.delete(&path).authorization_bearer(&other_token).await;

        assert_error_body(&get_response, StatusCode::NOT_FOUND, "Transaction not found");
        assert_error_body(
            &put_response,
            StatusCode::NOT_FOUND,
            "Transaction not found or not authorized to update",
        );
        assert_error_body(
            &delete_response,
            StatusCode::NOT_FOUND,
            "Transaction not found or not authorized to delete",
        );

        let response = server.get(&path).authorization_bearer(&owner_token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Transaction>(), transaction);
    }

    #[tokio::test]
    async fn transaction_round_trip() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;

        let created = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "description": "Coffee",
                "amount": 4.50,
                "type": "EXPENSE",
                "date": "2024-01-01",
            }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let id = created.json::<Value>()["id"].as_i64().expect("id should be an integer");

        let response = server
            .get(&format_endpoint(endpoints::TRANSACTION, id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["id"], json!(id));
        assert_eq!(body["description"], "Coffee");
        assert_eq!(body["amount"], json!(4.5));
        assert_eq!(body["type"], "EXPENSE");
        assert_eq!(body["date"], "2024-01-01T00:00:00Z");
        assert!(body["userId"].is_i64());
        assert!(body["createdAt"].is_string());
        assert!(body["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn patch_amount_only_changes_amount() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;
        let transaction = create_test_transaction(&server, &token, "Coffee").await;

        let response = server
            .patch(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .authorization_bearer(&token)
            .json(&json!({"amount": 10}))
            .await;

        response.assert_status_ok();
        let updated = response.json::<Transaction>();
        assert_eq!(updated.amount, 10.0);
        assert_eq!(updated.description, transaction.description);
        assert_eq!(updated.kind, transaction.kind);
        assert_eq!(updated.date, transaction.date);
    }

    #[tokio::test]
    async fn list_is_ordered_by_date_descending() {
        let (server, _) = get_test_server();
        let token = register_and_log_in(&server, "foo@bar.baz").await;
        for date in ["2024-01-02", "2024-03-01", "2023-12-31"] {
            server
                .post(endpoints::TRANSACTIONS)
                .authorization_bearer(&token)
                .json(&json!({
                    "description": date,
                    "amount": 1,
                    "type": "INCOME",
                    "date": date,
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let descriptions: Vec<String> = response
            .json::<Vec<Transaction>>()
            .into_iter()
            .map(|transaction| transaction.description)
            .collect();
        assert_eq!(descriptions, ["2024-03-01", "2024-01-02", "2023-12-31"]);
    }

    fn get_test_server_for_environment(environment: Environment) -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap(), "foobar")
            .unwrap()
            .with_hash_cost(4)
            .with_environment(environment);

        TestServer::try_new(build_router(state, None)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn error_stack_is_included_outside_production() {
        let server = get_test_server_for_environment(Environment::Development);

        let response = server.get(endpoints::TRANSACTIONS).await;

        response.assert_status_unauthorized();
        assert!(response.json::<Value>()["stack"].is_string());
    }

    #[tokio::test]
    async fn error_stack_is_omitted_in_production() {
        let server = get_test_server_for_environment(Environment::Production);

        let response = server.get(endpoints::TRANSACTIONS).await;

        response.assert_status_unauthorized();
        assert!(response.json::<Value>().get("stack").is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .content_type("application/json")
            .text("{\"email\": ")
            .await;

        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["statusCode"], 400);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let (server, _) = get_test_server();

        let response = server
            .get(endpoints::HEALTH)
            .add_header("Origin", "http://localhost:5173")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "*");
    }
}
