use crate::api::queries;
use crate::api::AppState;
use crate::error::ProcessingError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Internal(ProcessingError),
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(err) => {
                tracing::error!("Query failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to query database")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Raw query-string parameters; validated per endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoricalParams {
    pub county: Option<String>,
    pub year: Option<String>,
}

impl HistoricalParams {
    fn county(&self) -> Option<&str> {
        self.county.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn year(&self) -> Option<&str> {
        self.year.as_deref().map(str::trim).filter(|y| !y.is_empty())
    }
}

/// Years SQLite's `strftime('%Y', ...)` can produce.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

fn parse_year(raw: &str) -> std::result::Result<i32, ApiError> {
    let year = raw
        .parse::<i32>()
        .map_err(|_| ApiError::BadRequest("Year parameter must be an integer"))?;
    if !YEAR_RANGE.contains(&year) {
        return Err(ApiError::BadRequest("Year parameter is out of range"));
    }
    Ok(year)
}

/// Run a query on the blocking pool while holding the store lock.
async fn run_query<T, F>(state: &AppState, query: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> crate::Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || {
        let store = store
            .lock()
            .map_err(|_| ProcessingError::Query("store lock poisoned".to_string()))?;
        query(store.connection())
    })
    .await
    .map_err(ProcessingError::from)
    .and_then(|inner| inner);

    Ok(Json(result?))
}

pub async fn county_summary(State(state): State<AppState>) -> ApiResult<Vec<queries::CountyAverage>> {
    run_query(&state, queries::county_summary).await
}

pub async fn county_data(
    State(state): State<AppState>,
    Path(county): Path<String>,
) -> ApiResult<Vec<crate::models::CanonicalRecord>> {
    run_query(&state, move |conn| queries::county_latest(conn, &county)).await
}

pub async fn annual_trend(
    State(state): State<AppState>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<Vec<queries::YearAverage>> {
    let county = params
        .county()
        .ok_or(ApiError::BadRequest("County parameter is required"))?
        .to_string();
    run_query(&state, move |conn| queries::annual_trend(conn, &county)).await
}

pub async fn annual_map(
    State(state): State<AppState>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<Vec<queries::CountyAverage>> {
    let year = parse_year(params.year().ok_or(ApiError::BadRequest("Year parameter is required"))?)?;
    run_query(&state, move |conn| queries::annual_map(conn, year)).await
}

pub async fn seasonal_trend(
    State(state): State<AppState>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<Vec<queries::MonthAverage>> {
    let county = params
        .county()
        .ok_or(ApiError::BadRequest("County parameter is required"))?
        .to_string();
    run_query(&state, move |conn| queries::seasonal_trend(conn, &county)).await
}

fn county_and_year(params: &HistoricalParams) -> std::result::Result<(String, i32), ApiError> {
    match (params.county(), params.year()) {
        (Some(county), Some(year)) => Ok((county.to_string(), parse_year(year)?)),
        _ => Err(ApiError::BadRequest("County and Year parameters are required")),
    }
}

pub async fn monthly_distribution(
    State(state): State<AppState>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<Vec<queries::MonthDistribution>> {
    let (county, year) = county_and_year(&params)?;
    run_query(&state, move |conn| queries::monthly_distribution(conn, &county, year)).await
}

pub async fn unhealthy_days_count(
    State(state): State<AppState>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<queries::UnhealthyDaysComparison> {
    let (county, year) = county_and_year(&params)?;
    run_query(&state, move |conn| queries::unhealthy_days_comparison(conn, &county, year)).await
}
