//! Multi-instant forecast
//!
//! Sources are fetched once; the same occupancy and weather are then
//! evaluated at every step of the horizon.

use crate::error::{CycleCancelled, PipelineWarning};
use crate::pipeline::{EntityStatus, RefreshCycle};
use chrono::{Duration, NaiveDateTime};
use parkcast_common::time::forecast_instants;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const DEFAULT_HORIZON_HOURS: u32 = 48;
pub const DEFAULT_STEP_MINUTES: u32 = 5;
/// Upper bound on the horizon (one week)
pub const MAX_HORIZON_HOURS: u32 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub horizon_hours: u32,
    pub step_minutes: u32,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            horizon_hours: DEFAULT_HORIZON_HOURS,
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }
}

impl ForecastRequest {
    /// Reject empty or oversized horizons
    pub fn validate(&self) -> Result<(), String> {
        if self.horizon_hours == 0 || self.horizon_hours > MAX_HORIZON_HOURS {
            return Err(format!(
                "hours must be between 1 and {}, got {}",
                MAX_HORIZON_HOURS, self.horizon_hours
            ));
        }
        if self.step_minutes == 0 || self.step_minutes > self.horizon_hours * 60 {
            return Err(format!(
                "step_minutes must be between 1 and {}, got {}",
                self.horizon_hours * 60,
                self.step_minutes
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub entity: String,
    pub at: NaiveDateTime,
    pub predicted_occupancy: Option<f64>,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub start: NaiveDateTime,
    pub horizon_hours: u32,
    pub step_minutes: u32,
    pub occupancy_source: Option<String>,
    pub weather_source: Option<String>,
    pub points: Vec<ForecastPoint>,
    /// Distinct warnings over all instants
    pub warnings: Vec<PipelineWarning>,
}

pub async fn forecast(
    cycle: &RefreshCycle,
    start: NaiveDateTime,
    request: ForecastRequest,
    lot: Option<&str>,
    cancel: &CancellationToken,
) -> Result<ForecastReport, CycleCancelled> {
    let instants = forecast_instants(
        start,
        Duration::hours(i64::from(request.horizon_hours)),
        Duration::minutes(i64::from(request.step_minutes)),
    );
    info!(%start, steps = instants.len(), lot, "Forecast started");

    let inputs = cycle.fetch(cancel).await?;
    let gateway = cycle.gateway();
    let mut warnings = inputs.warnings();
    let mut points = Vec::new();

    for at in instants {
        let evaluation = cycle.evaluate(&inputs, gateway.as_ref(), at, lot, cancel)?;
        for w in evaluation.warnings {
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
        points.extend(evaluation.rows.into_iter().map(|row| ForecastPoint {
            entity: row.entity,
            at,
            predicted_occupancy: row.predicted_occupancy,
            status: row.status,
        }));
    }

    Ok(ForecastReport {
        start,
        horizon_hours: request.horizon_hours,
        step_minutes: request.step_minutes,
        occupancy_source: inputs.occupancy.source,
        weather_source: inputs.weather.source,
        points,
        warnings,
    })
}
