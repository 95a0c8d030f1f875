//! Request handlers for the REST API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use promql_adapters::{QueryData, RangeQuery, ValidationResult};
use promql_agent::{suggest_chart, ChartType, Conversion};
use promql_core::{parse_duration, AppError, CancellationToken};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::DropGuard;
use tracing::{debug, info, warn};

use crate::{ApiError, AppState};

/// Points per range query when no step is given.
const DEFAULT_RANGE_POINTS: u32 = 250;
const MIN_STEP: Duration = Duration::from_secs(1);
const HEALTH_QUERY: &str = "up";

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Cancellation scope of one request.
///
/// The token fires when the deadline elapses or when the handler future is
/// dropped, e.g. because the client went away.
struct RequestScope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestScope {
    fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    debug!(?timeout, "Request deadline elapsed");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });

        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(request)| request)
        .map_err(|e| AppError::input(e.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub query: String,
}

/// POST /api/v1/convert
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Conversion> {
    let request = body(payload)?;
    let scope = RequestScope::start(state.request_timeout);

    let conversion = state
        .translator
        .convert(&request.query, &scope.token)
        .await?;
    Ok(Json(conversion))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub promql: String,
}

/// POST /api/v1/validate
pub async fn validate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResult<ValidationResult> {
    let request = body(payload)?;
    let scope = RequestScope::start(state.request_timeout);

    let result = state.validator.validate(&request.promql, &scope.token).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub query: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub step: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    #[serde(flatten)]
    pub data: QueryData,
    pub chart_type: ChartType,
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| AppError::input(format!("invalid {}: {}", field, e)))
}

/// Range parameters, or `None` for an instant query.
fn range_query(request: &ExecuteRequest) -> Result<Option<RangeQuery>, AppError> {
    let (start, end) = match (&request.start, &request.end) {
        (Some(start), Some(end)) => (parse_time("start", start)?, parse_time("end", end)?),
        (None, None) => return Ok(None),
        _ => return Err(AppError::input("start and end must be given together")),
    };

    if end <= start {
        return Err(AppError::input("end must be after start"));
    }

    let step = match request.step.as_deref() {
        Some(step) => parse_duration(step).map_err(|e| AppError::input(e.to_string()))?,
        None => default_step(start, end),
    };

    Ok(Some(RangeQuery { start, end, step }))
}

fn default_step(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    let span = (end - start).to_std().unwrap_or_default();
    (span / DEFAULT_RANGE_POINTS).max(MIN_STEP)
}

/// POST /api/v1/execute
pub async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<ExecuteResponse> {
    let request = body(payload)?;
    if request.query.trim().is_empty() {
        return Err(AppError::input("query cannot be empty").into());
    }
    let scope = RequestScope::start(state.request_timeout);

    let data = match range_query(&request)? {
        Some(range) => {
            info!(step = ?range.step, "Executing range query");
            state
                .backend
                .query_range(&request.query, &range, &scope.token)
                .await?
        }
        None => {
            let time = request
                .timestamp
                .as_deref()
                .map(|ts| parse_time("timestamp", ts))
                .transpose()?;
            state.backend.query(&request.query, time, &scope.token).await?
        }
    };

    let chart_type = suggest_chart(&request.query, &data);
    Ok(Json(ExecuteResponse { data, chart_type }))
}

/// GET /api/v1/metrics
pub async fn list_metrics(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    let scope = RequestScope::start(state.request_timeout);
    let snapshot = state.schema.refresh(&scope.token).await?;
    Ok(Json(snapshot.names()))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let scope = RequestScope::start(state.request_timeout);
    let prometheus = match state.backend.query(HEALTH_QUERY, None, &scope.token).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Prometheus health probe failed: {}", e);
            false
        }
    };

    let (status, label) = if prometheus {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (status, Json(json!({ "status": label, "prometheus": prometheus })))
}
