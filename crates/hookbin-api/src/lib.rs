//! HTTP boundary for hookbin
//!
//! Two thin services over the history store: the Capture Service
//! (`/hook/{id}`, every method) and the Inspection Service
//! (`/api/endpoints/...`). Neither transforms event content; display-time
//! formatting is the client's concern.

pub mod handlers;
pub mod models;

use axum::{
    http::Method,
    routing::{any, get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hookbin_store::HistoryStore;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<HistoryStore>,
    pub public_base_url: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hookbin API",
        version = "0.1.0",
        description = "Disposable webhook capture and inspection",
        contact(
            name = "Hookbin Team",
            email = "team@hookbin.dev"
        )
    ),
    paths(
        handlers::create_endpoint,
        handlers::capture,
        handlers::list_events,
        handlers::get_endpoint_events,
        handlers::get_endpoint_meta,
        handlers::health_check,
    ),
    components(
        schemas(
            models::CreateEndpointResponse,
            models::CaptureAck,
            models::Event,
            models::EventList,
            models::EndpointMetaResponse,
            models::HealthResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "endpoints", description = "Endpoint creation and inspection"),
        (name = "capture", description = "Webhook capture"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the server
    pub bind_addr: SocketAddr,
    /// Enable CORS (webhook senders and browser clients come from anywhere)
    pub enable_cors: bool,
    /// Base URL used when building public capture URLs.
    /// Defaults to `http://{bind_addr}` when not set.
    pub public_base_url: Option<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080"
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            enable_cors: true,
            public_base_url: None,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server over the given store
    pub fn new(config: ApiServerConfig, store: Arc<HistoryStore>) -> Self {
        let public_base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", config.bind_addr))
            .trim_end_matches('/')
            .to_string();

        let state = Arc::new(AppState {
            store,
            public_base_url,
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        let api_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/endpoints", post(handlers::create_endpoint))
            .route("/api/endpoints/{id}", get(handlers::get_endpoint_events))
            .route("/api/endpoints/{id}/events", get(handlers::list_events))
            .route("/api/endpoints/{id}/meta", get(handlers::get_endpoint_meta))
            // Capture is not method-selective; any verb lands here
            .route("/hook/{id}", any(handlers::capture))
            .with_state(self.state.clone());

        // SwaggerUi automatically creates a route for /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            // No cookies or credentials anywhere in the API, so a fully
            // permissive policy is safe
            let cors = CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                ])
                .allow_headers(Any)
                .allow_origin(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server, running until ctrl-c
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting hookbin server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);
        info!("Capture URL template: {}/hook/{{id}}", self.state.public_base_url);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
