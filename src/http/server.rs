//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the rule management and resolution handlers
//! - Wire up middleware (request ID, tracing, timeout, limits, metrics)
//! - Bind server to listener and drain on shutdown
//!
//! # Routes
//! ```text
//! GET    /health
//! POST   /rules              create
//! GET    /rules[?active=true] list_all / list_active
//! GET    /rules/{*id}        get
//! PATCH  /rules/{*id}        update (target, expires_at)
//! DELETE /rules/{*id}        delete
//! POST   /prune[?now=ts]     prune
//! GET    /resolve?domain=&subdomain=&path=&query=a,b
//! GET    /resolve/explain?...
//! ```
//! Rule ids contain `/`, so the id routes use a catch-all segment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RouterConfig;
use crate::http::handlers;
use crate::http::response::error_response;
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::rules::RuleService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: RuleService,
}

/// HTTP server exposing the rule service.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
}

impl HttpServer {
    pub fn new(config: RouterConfig, service: RuleService) -> Self {
        let router = Self::build_router(&config, AppState { service });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &RouterConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/rules", get(handlers::list_rules).post(handlers::create_rule))
            .route(
                "/rules/{*id}",
                get(handlers::get_rule)
                    .patch(handlers::update_rule)
                    .delete(handlers::delete_rule),
            )
            .route("/prune", post(handlers::prune_rules))
            .route("/resolve", get(handlers::resolve))
            .route("/resolve/explain", get(handlers::explain))
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(
                Arc::new(Semaphore::new(
                    config.listener.max_connections.min(Semaphore::MAX_PERMITS),
                )),
                limit_concurrency,
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// A clone of the configured router, for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown broadcast fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.listener.max_connections,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Hold a permit for the lifetime of each request; excess requests wait.
async fn limit_concurrency(
    State(permits): State<Arc<Semaphore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Ok(_permit) = permits.acquire().await else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "server shutting down");
    };
    next.run(request).await
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use tower::ServiceExt;

    use crate::store::MemoryRuleStore;

    fn app() -> Router {
        let service = RuleService::new(Arc::new(MemoryRuleStore::new()));
        HttpServer::new(RouterConfig::default(), service).router()
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_client_request_id_is_kept() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "client-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-123");
    }

    #[tokio::test]
    async fn test_oversized_connection_limit_does_not_panic() {
        let mut config = RouterConfig::default();
        config.listener.max_connections = usize::MAX;
        let service = RuleService::new(Arc::new(MemoryRuleStore::new()));
        let response = HttpServer::new(config, service)
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rules")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }
}
