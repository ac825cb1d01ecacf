//! HTTP request handlers for the analytics API.

use crate::api::models::*;
use crate::batch::BatchScreenResult;
use crate::error::CaptureError;
use crate::orchestrator::{CurrentSnapshot, GammaReport, Orchestrator};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use common::Ticker;
use std::sync::Arc;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Maximum history rows a single request may ask for
const MAX_HISTORY_LIMIT: usize = 1000;

fn error_response(err: &CaptureError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, code = err.code(), "Request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
            timestamp: Utc::now(),
            retriable: err.is_retriable(),
        }),
    )
}

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        error_response(&err)
    }
}

fn parse_ticker(raw: &str) -> Result<Ticker, ApiError> {
    Ticker::parse(raw).map_err(|e| error_response(&e.into()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| error_response(&CaptureError::validation(rejection.body_text())))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| error_response(&CaptureError::validation(rejection.body_text())))
}

fn path_ticker(ticker: Result<Path<String>, PathRejection>) -> Result<Ticker, ApiError> {
    let Path(raw) =
        ticker.map_err(|rejection| error_response(&CaptureError::validation(rejection.body_text())))?;
    parse_ticker(&raw)
}

/// POST /options/flow/capture
pub async fn capture(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<CaptureRequest>, JsonRejection>,
) -> ApiResult<CaptureResponse> {
    let request = body(payload)?;
    let ticker = parse_ticker(&request.ticker)?;

    let screener = request.screen.then(|| orchestrator.settings().screener.clone());
    let result = orchestrator.capture(&ticker, screener.as_ref()).await?;
    Ok(Json(result.into()))
}

/// GET /options/flow/current/:ticker
pub async fn current(
    State(orchestrator): State<Arc<Orchestrator>>,
    ticker: Result<Path<String>, PathRejection>,
    params: Result<Query<CurrentParams>, QueryRejection>,
) -> ApiResult<CurrentSnapshot> {
    let ticker = path_ticker(ticker)?;
    let params = query(params)?;
    let snapshot = orchestrator.current(&ticker, params.include_details).await?;
    Ok(Json(snapshot))
}

/// GET /options/flow/history/:ticker
pub async fn history(
    State(orchestrator): State<Arc<Orchestrator>>,
    ticker: Result<Path<String>, PathRejection>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let ticker = path_ticker(ticker)?;
    let params = query(params)?;
    if params.days_back == 0 {
        return Err(CaptureError::validation("days_back must be positive").into());
    }

    let snapshots = orchestrator
        .history(&ticker, params.days_back, params.limit.min(MAX_HISTORY_LIMIT))
        .await?;
    Ok(Json(HistoryResponse {
        ticker: ticker.to_string(),
        days_back: params.days_back,
        count: snapshots.len(),
        snapshots,
    }))
}

/// POST /options/gamma/analyze
pub async fn analyze_gamma(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<GammaRequest>, JsonRejection>,
) -> ApiResult<GammaReport> {
    let request = body(payload)?;
    let ticker = parse_ticker(&request.ticker)?;

    let report = orchestrator
        .analyze_gamma(&ticker, request.days_back, request.expiration_code.as_deref())
        .await?;
    Ok(Json(report))
}

/// POST /options/arbitrage/screen
///
/// Always 200 once the request validates; per-ticker failures are reported
/// inside the result.
pub async fn screen(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> ApiResult<BatchScreenResult> {
    let request = body(payload)?;
    let params = request
        .params(&orchestrator.settings().screener)
        .map_err(|msg| error_response(&CaptureError::validation(msg)))?;
    let symbols =
        orchestrator.resolve_symbols(request.symbols.as_deref(), request.list_name.as_deref())?;

    Ok(Json(orchestrator.screen_batch(&symbols, &params).await))
}
