//! Stock Analysis API Routes
//!
//! Indicator payloads, narrative reports and free-form questions for a ticker.

use analysis_core::{Period, TickerInfo};
use analysis_orchestrator::{Narrative, PreparedAnalysis};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Serialize)]
pub struct StockDataResponse {
    pub ticker: String,
    pub period: Period,
    pub info: TickerInfo,
    pub payload: serde_json::Value,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub data: StockDataResponse,
    pub narrative: Narrative,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub ticker: String,
    pub answer: String,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/:ticker", get(get_stock_data))
        .route("/api/stocks/:ticker/analysis", post(analyze_stock))
        .route("/api/stocks/:ticker/ask", post(ask_about_stock))
}

/// Missing period means the default one-month window
fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Ok(p.parse::<Period>()?),
        None => Ok(Period::default()),
    }
}

impl From<PreparedAnalysis> for StockDataResponse {
    fn from(prepared: PreparedAnalysis) -> Self {
        Self {
            payload: prepared.analysis.to_payload(),
            ticker: prepared.ticker,
            period: prepared.period,
            info: prepared.info,
        }
    }
}

async fn get_stock_data(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<StockDataResponse>>, AppError> {
    let period = parse_period(query.period.as_deref())?;
    let prepared = state.service.prepare(&ticker, period).await?;

    Ok(Json(ApiResponse::success(prepared.into())))
}

async fn analyze_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AnalysisResponse>>, AppError> {
    let request = match body {
        Ok(Json(request)) => request,
        // No JSON body at all: default period
        Err(JsonRejection::MissingJsonContentType(_)) => AnalysisRequest::default(),
        Err(rejection) => {
            return Err(AppError::with_status(
                StatusCode::BAD_REQUEST,
                anyhow::anyhow!("Invalid request body: {}", rejection.body_text()),
            ))
        }
    };
    let period = parse_period(request.period.as_deref())?;
    let report = state.service.analyze(&ticker, period).await?;

    Ok(Json(ApiResponse::success(AnalysisResponse {
        data: report.prepared.into(),
        narrative: report.narrative,
    })))
}

async fn ask_about_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ApiResponse<AskResponse>>, AppError> {
    let period = parse_period(request.period.as_deref())?;
    let answer = state.service.ask(&ticker, period, &request.question).await?;

    Ok(Json(ApiResponse::success(AskResponse {
        ticker: ticker.trim().to_uppercase(),
        answer,
    })))
}
