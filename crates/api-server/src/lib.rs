pub mod stock_routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use analysis_core::{AnalysisError, IndicatorConfig};
use analysis_orchestrator::{AnalysisService, CachedMarketData, PipelineOrchestrator, DEFAULT_CACHE_TTL_SECS};
use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use narrative_client::{AnthropicClient, NarrativeConfig};
use polygon_client::PolygonClient;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Envelope around every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to report
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidConfig(_) | AnalysisError::InvalidInput(_) | AnalysisError::InvalidData(_) => {
            StatusCode::BAD_REQUEST
        }
        AnalysisError::EmptySeries | AnalysisError::NoData(_) => StatusCode::NOT_FOUND,
        AnalysisError::NoNarrative(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        let status = error
            .downcast_ref::<AnalysisError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::warn!("Request rejected ({}): {:#}", self.status, self.error);
        }
        (self.status, Json(ApiResponse::<()>::error(self.error.to_string()))).into_response()
    }
}

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cache_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let cache_ttl_secs = match std::env::var("MARKET_DATA_CACHE_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .context("MARKET_DATA_CACHE_TTL_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            bind_addr,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(stock_routes::stock_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env()?;
    let indicator_config = IndicatorConfig::from_env().context("invalid indicator configuration")?;
    let pipeline = PipelineOrchestrator::new(indicator_config).context("invalid indicator configuration")?;
    tracing::info!("Indicator pipeline: {}", pipeline.steps().join(" -> "));

    let polygon = PolygonClient::from_env().context("market data source not configured")?;
    let source = CachedMarketData::new(polygon, server_config.cache_ttl);
    let mut service = AnalysisService::new(Arc::new(source), pipeline);

    match NarrativeConfig::from_env() {
        Ok(config) => {
            let client = AnthropicClient::new(config);
            tracing::info!("Narrative generation enabled ({})", client.model());
            service = service.with_generator(Arc::new(client));
        }
        Err(e) => tracing::warn!("Narrative generation disabled: {}", e),
    }

    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server_config.bind_addr))?;
    tracing::info!("API server listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
