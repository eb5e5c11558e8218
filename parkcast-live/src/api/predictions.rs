//! Prediction and forecast handlers
//!
//! GET /predictions?at=YYYY-MM-DDTHH:MM, GET /forecast?hours=&step_minutes=&lot=&start=
//!
//! Both run through the shared in-flight slot: a new request cancels the
//! cycle still running for an earlier one, which then answers 409.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use parkcast_common::time::{now_local_minute, truncate_to_minute};
use serde::Deserialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult, PipelineWarning};
use crate::forecast::{forecast, ForecastReport, ForecastRequest};
use crate::pipeline::CycleReport;
use crate::AppState;

const INSTANT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// GET /predictions query
#[derive(Debug, Default, Deserialize)]
pub struct PredictionsQuery {
    pub at: Option<String>,
}

/// GET /forecast query
#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub hours: Option<u32>,
    pub step_minutes: Option<u32>,
    pub lot: Option<String>,
    pub start: Option<String>,
}

/// Parse a local instant; seconds are dropped
pub fn parse_instant(raw: &str) -> Result<NaiveDateTime, ApiError> {
    INSTANT_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw.trim(), f).ok())
        .map(truncate_to_minute)
        .ok_or_else(|| {
            ApiError::BadRequest(format!("invalid instant {:?}, expected YYYY-MM-DDTHH:MM", raw))
        })
}

fn instant_or_now(raw: Option<&str>) -> Result<NaiveDateTime, ApiError> {
    raw.map_or_else(|| Ok(now_local_minute()), parse_instant)
}

/// GET /predictions
pub async fn get_predictions(
    State(state): State<AppState>,
    query: Result<Query<PredictionsQuery>, QueryRejection>,
) -> ApiResult<Json<CycleReport>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let at = instant_or_now(query.at.as_deref())?;

    let (id, token) = state.begin_cycle().await;
    let result = state.cycle.run(at, &token).await;
    state.finish_cycle(id).await;

    let report = result?;
    state.set_last_error(degradation(&report.warnings)).await;
    Ok(Json(report))
}

/// GET /forecast
pub async fn get_forecast(
    State(state): State<AppState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> ApiResult<Json<ForecastReport>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let defaults = ForecastRequest::default();
    let request = ForecastRequest {
        horizon_hours: query.hours.unwrap_or(defaults.horizon_hours),
        step_minutes: query.step_minutes.unwrap_or(defaults.step_minutes),
    };
    request.validate().map_err(ApiError::BadRequest)?;
    let start = instant_or_now(query.start.as_deref())?;

    let lot = query.lot.as_deref().map(str::trim).filter(|l| !l.is_empty());
    if let Some(lot) = lot {
        let known = state.cycle.metadata().lookup(lot).is_some();
        if !known {
            warn!(lot, "Forecast requested for lot missing from metadata table");
        }
    }

    let (id, token) = state.begin_cycle().await;
    let result = forecast(&state.cycle, start, request, lot, &token).await;
    state.finish_cycle(id).await;

    let report = result?;
    state.set_last_error(degradation(&report.warnings)).await;
    Ok(Json(report))
}

/// Short description of defaulted categories, for /health
fn degradation(warnings: &[PipelineWarning]) -> Option<String> {
    let defaulted: Vec<&str> = warnings
        .iter()
        .filter_map(|w| match w {
            PipelineWarning::DefaultedFallback { category, .. } => Some(category.as_str()),
            _ => None,
        })
        .collect();
    if defaulted.is_empty() {
        None
    } else {
        Some(format!("all {} sources failed, defaults used", defaulted.join(" and ")))
    }
}

/// Build prediction routes
pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/predictions", get(get_predictions))
        .route("/forecast", get(get_forecast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_instant() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_instant("2024-05-15T14:30").unwrap(), expected);
        assert_eq!(parse_instant("2024-05-15T14:30:59").unwrap(), expected);
        assert!(parse_instant("15.05.2024 14:30").is_err());
        assert!(parse_instant("2024-05-15T25:00").is_err());
    }

    #[test]
    fn test_degradation_message() {
        assert_eq!(degradation(&[PipelineWarning::NoPredictor]), None);
        let w = PipelineWarning::DefaultedFallback {
            category: "weather".into(),
            failures: Vec::new(),
        };
        assert_eq!(
            degradation(&[w]).as_deref(),
            Some("all weather sources failed, defaults used")
        );
    }
}
