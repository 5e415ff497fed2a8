mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use chrono::Utc;
use pawtrip_agents::{build_agent_from_env, AgentBootstrap, PetTravelAgent, QueryAnalysis};
use pawtrip_core::{ChatInput, ConciergeReply};
use pawtrip_observability::{AppMetrics, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use crate::rate_limit::{ClientRateLimiter, Throttled};

const MAX_QUERY_CHARS: usize = 500;
const BODY_LIMIT_BYTES: usize = 64 * 1024;
const DEFAULT_API_KEY: &str = "dev-pawtrip-key";

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<PetTravelAgent>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub bootstrap: Option<AgentBootstrap>,
}

impl ApiState {
    /// State around an already-built agent, with permissive limits.
    pub fn new(agent: PetTravelAgent, api_key: impl Into<String>) -> Self {
        Self {
            metrics: agent.metrics().clone(),
            agent: Arc::new(agent),
            api_key: api_key.into(),
            limiter: ClientRateLimiter::new(Duration::from_secs(60), 80),
            allowed_origins: Arc::new(Vec::new()),
            bootstrap: None,
        }
    }

    pub fn with_limiter(mut self, limiter: ClientRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    collaborators: Option<AgentBootstrap>,
}

/// Builds the full app from `PAWTRIP_*` variables.
pub fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();
    let (agent, bootstrap) = build_agent_from_env(metrics.clone())?;

    let api_key = env::var("PAWTRIP_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());
    let window = Duration::from_secs(env_or("PAWTRIP_RATE_LIMIT_WINDOW_SECONDS", 60));
    let max_requests = env_or("PAWTRIP_RATE_LIMIT_MAX", 80) as usize;
    let max_clients = env_or("PAWTRIP_RATE_LIMIT_MAX_CLIENTS", 10_000) as usize;
    let allowed_origins = env::var("PAWTRIP_ALLOWED_ORIGINS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    info!(
        window_seconds = window.as_secs(),
        max_requests,
        max_clients,
        origins = allowed_origins.len(),
        "api configured"
    );

    let state = ApiState {
        agent: Arc::new(agent),
        metrics,
        api_key,
        limiter: ClientRateLimiter::new(window, max_requests).with_max_tracked_clients(max_clients),
        allowed_origins: Arc::new(allowed_origins),
        bootstrap: Some(bootstrap),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/analyze", post(analyze))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        collaborators: state.bootstrap.clone(),
    };
    (StatusCode::OK, Json(payload))
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let text = match validated_text(&request.text) {
        Ok(text) => text,
        Err(response) => return response,
    };

    let reply: ConciergeReply = state.agent.handle_query(ChatInput { text }).await;
    (StatusCode::OK, Json(reply)).into_response()
}

async fn analyze(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let text = match validated_text(&request.text) {
        Ok(text) => text,
        Err(response) => return response,
    };

    let analysis: QueryAnalysis = state.agent.analyze(&text).await;
    (StatusCode::OK, Json(analysis)).into_response()
}

fn validated_text(raw: &str) -> Result<String, Response> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(bad_request("text must not be empty"));
    }
    if text.chars().count() > MAX_QUERY_CHARS {
        return Err(bad_request("text is too long"));
    }
    Ok(text.to_string())
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "invalid_request",
            "message": message
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if let Err(throttled) = state.limiter.check(&ip) {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this client"
            })),
        )
            .into_response();
        let seconds = throttled.retry_after.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}

fn env_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
