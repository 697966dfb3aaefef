//! HTTP gateway for Synapse.
//!
//! Exposes the streaming chat pipeline, the upload explorer and the
//! interaction history over HTTP.
//!
//! Built on Axum for high performance async HTTP.

pub mod chat;
pub mod files;
pub mod history;
pub mod uploads;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use synapse_config::{AppConfig, GatewayConfig};
use synapse_core::error::StoreError;
use synapse_core::interaction::InteractionStore;
use synapse_engine::{ChatPipeline, ContextError};

use crate::uploads::UploadDir;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: ChatPipeline,
    pub store: Arc<dyn InteractionStore>,
    pub uploads: UploadDir,
    /// Persist every answer that streamed to completion.
    pub auto_save: bool,
    /// When set, every route except `/health` requires `Authorization: Bearer <token>`.
    pub api_token: Option<String>,
}

pub type SharedState = Arc<GatewayState>;

// --- Errors ---

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// A failed request: status code plus a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn from_store(e: StoreError) -> Self {
        error!(error = %e, "Interaction store failure");
        Self::internal(e.to_string())
    }

    /// Bad input is the caller's fault; a crashed builder task is ours.
    pub fn from_context(e: ContextError) -> Self {
        match e {
            ContextError::Join(_) => {
                error!(error = %e, "Context builder failure");
                Self::internal(e.to_string())
            }
            ContextError::Image { .. } => Self::bad_request(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// `{"status": ...}` with an optional message.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn new(status: &'static str) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

// --- Router ---

/// Build the full router.
///
/// Layers applied:
/// - Optional bearer token authentication (all routes but `/health`)
/// - Request body size limit (`gateway.max_upload_bytes`)
/// - In-memory rate limiting (`gateway.rate_limit_per_minute` per client)
/// - CORS for `gateway.allowed_origin`
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(
        gateway.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/stream_process", post(chat::stream_process_handler))
        .route("/v1/chat/stream", post(chat::chat_stream_handler))
        .route("/list_files", get(files::list_files_handler))
        .route("/delete_file/{filename}", delete(files::delete_file_handler))
        .route(
            "/history",
            get(history::list_history_handler).post(history::save_history_handler),
        )
        .route(
            "/history/{id}",
            put(history::update_history_handler).delete(history::delete_history_handler),
        )
        .route("/clear_history", delete(history::clear_history_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
        .layer(DefaultBodyLimit::max(gateway.max_upload_bytes))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors_layer(&gateway.allowed_origin))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid allowed_origin; cross-origin requests disabled");
            cors
        }
    }
}

/// Start the gateway HTTP server.
///
/// The provider client, pipeline and store are built once and shared.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = synapse_providers::build_from_config(&config);
    let pipeline = ChatPipeline::from_config(&config, provider);
    let store = synapse_memory::open_store(&config.storage).await?;
    let uploads = UploadDir::create(config.gateway.upload_dir())?;

    info!(
        provider = %pipeline.provider().name(),
        store = %store.name(),
        uploads = %uploads.root().display(),
        "Gateway components ready"
    );

    let state = Arc::new(GatewayState {
        pipeline,
        store,
        uploads,
        auto_save: config.storage.auto_save,
        api_token: config.gateway.api_token.clone(),
    });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key. A limit of zero disables it.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict stale clients once the map grows large
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Keyed on the Authorization header, or "anonymous". `/health` is exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key.chars().take(20).collect::<String>(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

/// Requires `Authorization: Bearer <api_token>` when a token is configured.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(req).await);
    };
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(next.run(req).await)
    } else {
        warn!(path = %req.uri().path(), "Unauthorized request: missing or invalid bearer token");
        Err(StatusCode::UNAUTHORIZED)
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
