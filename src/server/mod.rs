//! HTTP surface: Axum router, middleware stack and server lifecycle.
//!
//! Handlers translate JSON bodies into service calls and map
//! [`KanbanError`](crate::error::KanbanError) through [`ApiError`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::service::KanbanServices;
use crate::storage::Storage;

pub mod error;
pub mod extractors;
pub mod routes;

pub use error::ApiError;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host (default: 0.0.0.0)
    pub host: String,

    /// Port to listen on (default: 8080)
    pub port: u16,

    /// SQLite database file (default: mkanban.db). Read by the binary when
    /// it opens storage; [`serve`] takes an already opened backend.
    pub database_path: PathBuf,

    /// Allowed CORS origins, comma separated; `*` allows any
    pub cors_origin: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: PathBuf::from("mkanban.db"),
            cors_origin: "http://localhost:5173".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Shared application state
pub struct AppState {
    pub services: KanbanServices,
    /// Storage backend name reported by `/health`
    pub backend: &'static str,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let backend = storage.backend_name();
        Self {
            services: KanbanServices::new(storage),
            backend,
        }
    }
}

/// Builds the router with all routes and the middleware stack
pub fn build_router(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    let cors = cors_layer(&config.cors_origin)?;

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(cors);

    Ok(Router::new()
        .merge(routes::health::router())
        .merge(routes::boards::router())
        .merge(routes::columns::router())
        .merge(routes::cards::router())
        .with_state(Arc::new(state))
        .layer(middleware))
}

fn cors_layer(origins: &str) -> anyhow::Result<CorsLayer> {
    let origins: Vec<&str> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let allow_origin = if origins.iter().any(|o| *o == "*") {
        warn!("CORS: all origins allowed");
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Serves the API on `config`'s address until Ctrl+C or SIGTERM
pub async fn serve(config: ServerConfig, storage: Arc<dyn Storage>) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let backend = storage.backend_name();
    let app = build_router(AppState::new(storage), &config)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(storage = backend, "mkanban listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let storage = Arc::new(MemoryStorage::new());
        build_router(AppState::new(storage), &ServerConfig::default()).unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn seed_board(app: &Router) -> (String, String, String) {
        let (_, board) = send(app, "POST", "/boards", Some(json!({"name": "Roadmap"}))).await;
        let board_id = board["id"].as_str().unwrap().to_string();

        let mut column_ids = Vec::new();
        for (position, name) in ["Todo", "Done"].iter().enumerate() {
            let (status, column) = send(
                app,
                "POST",
                "/columns",
                Some(json!({"boardId": board_id, "name": name, "position": position})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            column_ids.push(column["id"].as_str().unwrap().to_string());
        }

        (board_id, column_ids.remove(0), column_ids.remove(0))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn test_boards_crud() {
        let app = app();

        let (status, board) = send(&app, "POST", "/boards", Some(json!({"name": " Roadmap "}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(board["name"], "Roadmap");
        let id = board["id"].as_str().unwrap();

        let (status, renamed) = send(
            &app,
            "PATCH",
            &format!("/boards/{id}"),
            Some(json!({"name": "Q3 plan"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Q3 plan");

        let (status, boards) = send(&app, "GET", "/boards", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(boards.as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "DELETE", &format!("/boards/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let (status, body) = send(&app, "GET", &format!("/boards/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_invalid_board_name_is_400() {
        let (status, body) = send(&app(), "POST", "/boards", Some(json!({"name": "A"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "Board name must be at least 2 characters");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/boards")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_columns_listed_with_cards() {
        let app = app();
        let (board_id, todo, _) = seed_board(&app).await;

        let (status, card) = send(
            &app,
            "POST",
            "/cards",
            Some(json!({"boardId": board_id, "columnId": todo, "title": "Write docs"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(card["position"], 0);

        let (status, columns) = send(&app, "GET", &format!("/columns/board/{board_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let columns = columns.as_array().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0]["name"], "Todo");
        assert_eq!(columns[0]["cards"][0]["title"], "Write docs");
        assert_eq!(columns[1]["cards"], json!([]));
    }

    #[tokio::test]
    async fn test_move_card_across_columns() {
        let app = app();
        let (board_id, todo, done) = seed_board(&app).await;

        let mut ids = Vec::new();
        for title in ["c1", "c2", "c3"] {
            let (_, card) = send(
                &app,
                "POST",
                "/cards",
                Some(json!({"boardId": board_id, "columnId": todo, "title": title})),
            )
            .await;
            ids.push(card["id"].as_str().unwrap().to_string());
        }

        let (status, moved) = send(
            &app,
            "PATCH",
            &format!("/cards/{}/move", ids[0]),
            Some(json!({"toColumnId": done, "toPosition": 9999})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["columnId"], done.as_str());
        assert_eq!(moved["position"], 0);

        let (_, columns) = send(&app, "GET", &format!("/columns/board/{board_id}"), None).await;
        let remaining: Vec<i64> = columns[0]["cards"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["position"].as_i64().unwrap())
            .collect();
        assert_eq!(remaining, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_move_card_to_missing_column_is_404() {
        let app = app();
        let (board_id, todo, _) = seed_board(&app).await;
        let (_, card) = send(
            &app,
            "POST",
            "/cards",
            Some(json!({"boardId": board_id, "columnId": todo, "title": "c1"})),
        )
        .await;

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/cards/{}/move", card["id"].as_str().unwrap()),
            Some(json!({"toColumnId": "missing", "toPosition": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_card_clears_description() {
        let app = app();
        let (board_id, todo, _) = seed_board(&app).await;
        let (_, card) = send(
            &app,
            "POST",
            "/cards",
            Some(json!({
                "boardId": board_id,
                "columnId": todo,
                "title": "c1",
                "description": "details"
            })),
        )
        .await;
        let uri = format!("/cards/{}", card["id"].as_str().unwrap());

        let (status, updated) = send(&app, "PATCH", &uri, Some(json!({"title": "Renamed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "details");

        let (_, cleared) = send(&app, "PATCH", &uri, Some(json!({"description": null}))).await;
        assert_eq!(cleared["description"], Value::Null);
        assert_eq!(cleared["title"], "Renamed");
    }

    #[tokio::test]
    async fn test_move_and_delete_column() {
        let app = app();
        let (board_id, todo, done) = seed_board(&app).await;

        let (status, moved) = send(
            &app,
            "PATCH",
            &format!("/columns/{done}/move"),
            Some(json!({"toPosition": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["position"], 0);

        let (status, renamed) = send(
            &app,
            "PATCH",
            &format!("/columns/{todo}/rename"),
            Some(json!({"name": "Backlog"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Backlog");
        assert_eq!(renamed["position"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/columns/{todo}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, columns) = send(&app, "GET", &format!("/columns/board/{board_id}"), None).await;
        assert_eq!(columns.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", &format!("/columns/{todo}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_rejects_invalid_origin() {
        assert!(cors_layer("http://localhost:5173, *").is_ok());
        assert!(cors_layer("http://bad\norigin").is_err());
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:8080");
    }
}
