//! HTTP router, shared state and server lifecycle.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::Json,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::TaskService;
use crate::task_store::{create_task_store, TaskStore};

use super::auth::{self, IdentityProvider};
use super::tasks as tasks_api;
use super::types::{ErrorBody, ErrorDetail, HealthResponse};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Task service over the configured store
    pub tasks: TaskService,
    /// Resolves the caller of every protected request
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// State with the identity provider selected by `config.auth`.
    pub fn new(config: Config, store: Arc<dyn TaskStore>) -> Self {
        let identity = auth::provider_for(&config.auth);
        Self::with_identity(config, store, identity)
    }

    pub fn with_identity(
        config: Config,
        store: Arc<dyn TaskStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            tasks: TaskService::new(store),
            identity,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .nest("/api/v1/internal/task", tasks_api::routes())
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = create_task_store(config.store, config.data_dir.clone()).await?;
    tracing::info!(
        "Task store: {} (persistent: {})",
        config.store.as_str(),
        store.is_persistent()
    );

    let state = Arc::new(AppState::new(config.clone(), store));
    tracing::info!("Auth mode: {}", state.identity.mode());
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.tasks.store();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.config.store.as_str().to_string(),
        persistent: store.is_persistent(),
        auth_mode: state.identity.mode().to_string(),
    })
}

/// JSON 404 for unknown paths and for known paths called with an unsupported method.
pub(super) async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<ErrorBody>) {
    let path = uri.path().to_string();
    tracing::debug!("No route for {} {}", method, path);
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(ErrorDetail {
            code: "NOT_FOUND".to_string(),
            message: format!("Route {} {} not found", method, path),
            path: Some(path),
            method: Some(method.to_string()),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{JwtIdentity, Permission, SecurityRule, StaticIdentity};
    use crate::task_store::InMemoryTaskStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TASKS: &str = "/api/v1/internal/task";
    const SECRET: &str = "router-test-secret";

    fn dev_app() -> Router {
        let state = AppState::with_identity(
            Config::dev(),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(StaticIdentity::default()),
        );
        build_router(Arc::new(state))
    }

    fn jwt_app() -> Router {
        let state = AppState::with_identity(
            Config::dev(),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(JwtIdentity::new(SECRET)),
        );
        build_router(Arc::new(state))
    }

    fn token(account_id: i64, grants: &[Permission]) -> String {
        let rules: Vec<SecurityRule> = grants
            .iter()
            .map(|p| SecurityRule::new("TASK", *p))
            .collect();
        JwtIdentity::new(SECRET)
            .issue(account_id, 1, &rules, chrono::Duration::hours(1))
            .unwrap()
    }

    fn request(
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
        send(app, request("POST", TASKS, None, Some(body))).await
    }

    #[tokio::test]
    async fn test_create_with_due_date_and_time() {
        let app = dev_app();
        let (status, body) = create(
            &app,
            json!({
                "title": "Pay bills",
                "priority": "alta",
                "dueDate": "2099-01-01T00:00:00Z",
                "dueTime": "14:30"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let task = &body["data"];
        assert_eq!(task["priority"], "alta");
        assert_eq!(task["dueTime"], "14:30");
        assert_eq!(task["status"], "pendente");
        assert_eq!(task["deleted"], false);
        assert_eq!(task["idAccount"], 1);
        assert_eq!(task["dateCreated"], task["dateModified"]);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_create_rejects_rule_violations_without_writing() {
        let app = dev_app();
        let cases = [
            (
                json!({"title": "Xyz", "priority": "baixa", "dueTime": "09:00"}),
                "dueDateRequiredWhenTimeProvided",
            ),
            (
                json!({
                    "title": "Recurring",
                    "priority": "média",
                    "recurrence": {"type": "semanal", "frequency": 1}
                }),
                "dueDateRequiredForRecurrence",
            ),
            (
                json!({
                    "title": "Recurring",
                    "priority": "média",
                    "dueDate": "2099-01-01T00:00:00Z",
                    "recurrence": {
                        "type": "semanal",
                        "frequency": 1,
                        "endDate": "2098-01-01T00:00:00Z"
                    }
                }),
                "recurrenceEndDateMustBeAfterDueDate",
            ),
            (
                json!({"title": "Past", "priority": "alta", "dueDate": "2000-01-01T00:00:00Z"}),
                "dueDateCannotBeInPast",
            ),
        ];

        for (input, code) in cases {
            let (status, body) = create(&app, input).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], code);
        }

        let (_, body) = send(&app, request("GET", TASKS, None, None)).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_create_rejects_schema_errors() {
        let app = dev_app();

        let (status, body) = create(&app, json!({"title": "X", "priority": "baixa"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["path"], "title");

        // A one-character title fails its length check before any date rule.
        let (status, body) = create(
            &app,
            json!({"title": "X", "priority": "baixa", "dueTime": "09:00"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["path"], "title");

        let (status, body) = create(&app, json!({"title": "Valid", "priority": "urgent"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = create(
            &app,
            json!({
                "title": "Valid",
                "priority": "alta",
                "dueDate": "2099-01-01T00:00:00Z",
                "recurrence": {"type": "diária", "frequency": 31}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["path"], "recurrence.frequency");
    }

    #[tokio::test]
    async fn test_read_update_delete_cycle() {
        let app = dev_app();
        let (_, created) = create(&app, json!({"title": "Buy milk", "priority": "baixa"})).await;
        let id = created["data"]["id"].as_i64().unwrap();
        let item = format!("{}/{}", TASKS, id);

        let (status, body) = send(&app, request("GET", &item, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Buy milk");

        let (status, body) = send(
            &app,
            request("PATCH", &item, None, Some(json!({"status": "concluida"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "concluida");

        let (status, body) = send(&app, request("DELETE", &item, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id);

        let (status, body) = send(&app, request("GET", &item, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (_, body) = send(&app, request("GET", TASKS, None, None)).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_a_validation_error() {
        let app = dev_app();
        let uri = format!("{}/abc", TASKS);
        let (status, body) = send(&app, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let app = dev_app();
        let (status, body) = send(&app, request("GET", "/api/v1/nope", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["path"], "/api/v1/nope");
        assert_eq!(body["error"]["method"], "GET");
    }

    #[tokio::test]
    async fn test_unsupported_method_on_task_paths_returns_json_404() {
        let app = dev_app();
        let item = format!("{}/5", TASKS);
        for (method, uri) in [("PUT", TASKS), ("POST", item.as_str())] {
            let (status, body) = send(&app, request(method, uri, None, None)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "NOT_FOUND");
            assert_eq!(body["error"]["path"], uri);
            assert_eq!(body["error"]["method"], method);
        }
    }

    #[tokio::test]
    async fn test_health_reports_store_and_auth_mode() {
        let (status, body) = send(&dev_app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["persistent"], false);
        assert_eq!(body["authMode"], "disabled");

        let (status, body) = send(&jwt_app(), request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authMode"], "jwt");
    }

    #[tokio::test]
    async fn test_jwt_missing_token_is_unauthorized() {
        let (status, body) = send(&jwt_app(), request("GET", TASKS, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_missing_permission_is_forbidden_and_writes_nothing() {
        let app = jwt_app();
        let reader = token(1, &[Permission::Read]);

        let (status, body) = send(
            &app,
            request(
                "POST",
                TASKS,
                Some(&reader),
                Some(json!({"title": "Sneaky", "priority": "alta"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, body) = send(&app, request("GET", TASKS, Some(&reader), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_listing_is_isolated_per_account() {
        let app = jwt_app();
        let alice = token(1, &[Permission::Create, Permission::Read]);
        let bob = token(2, &[Permission::Create, Permission::Read]);

        for (who, title) in [(&alice, "First"), (&bob, "Other"), (&alice, "Second")] {
            let (status, _) = send(
                &app,
                request(
                    "POST",
                    TASKS,
                    Some(who),
                    Some(json!({"title": title, "priority": "média"})),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = send(&app, request("GET", TASKS, Some(&alice), None)).await;
        let titles: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);

        let (_, body) = send(&app, request("GET", TASKS, Some(&bob), None)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["idAccount"], 2);
    }
}
