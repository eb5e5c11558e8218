//! Open-Meteo weather API adapter
//!
//! Request by fixed lat/lon. Current temperature and WMO weather code come
//! from the `current` block; humidity and precipitation come from the
//! `hourly` series entry for the current hour.

use super::{HttpFetcher, SourceAdapter};
use crate::error::{AdapterFailure, FailureCause};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parkcast_common::time::{now_local_minute, truncate_to_hour};
use parkcast_common::WeatherSnapshot;
use serde::Deserialize;
use tracing::debug;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: Option<CurrentBlock>,
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: Option<String>,
    temperature_2m: Option<f64>,
    weather_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
}

pub struct OpenMeteoSource {
    api_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    http: HttpFetcher,
}

impl OpenMeteoSource {
    pub fn new(
        api_url: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
        http: HttpFetcher,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            latitude,
            longitude,
            timezone: timezone.into(),
            http,
        }
    }

    fn request_url(&self) -> Result<String, FailureCause> {
        let url = reqwest::Url::parse_with_params(
            &self.api_url,
            &[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                ("hourly", "relative_humidity_2m,precipitation".to_string()),
                ("timezone", self.timezone.clone()),
                ("forecast_days", "2".to_string()),
            ],
        )
        .map_err(|e| FailureCause::Parse(format!("invalid weather API url: {}", e)))?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl SourceAdapter for OpenMeteoSource {
    type Output = WeatherSnapshot;

    fn source_id(&self) -> &str {
        "open-meteo"
    }

    async fn fetch(&self) -> Result<WeatherSnapshot, AdapterFailure> {
        let fail = |cause| AdapterFailure::new(self.source_id(), cause);
        let url = self.request_url().map_err(fail)?;
        let body = self.http.get_text(self.source_id(), &url).await?;
        parse_weather_response(&body, now_local_minute()).map_err(fail)
    }
}

/// Parse an API response
///
/// The hourly entry is picked by the response's `current.time` truncated to
/// the hour; `fallback_now` is used only when the response carries no time.
pub fn parse_weather_response(
    body: &str,
    fallback_now: NaiveDateTime,
) -> Result<WeatherSnapshot, FailureCause> {
    let doc: OpenMeteoResponse =
        serde_json::from_str(body).map_err(|e| FailureCause::Parse(e.to_string()))?;

    let current = doc
        .current
        .ok_or_else(|| FailureCause::MissingKey("current".to_string()))?;
    let temperature_c = current
        .temperature_2m
        .ok_or_else(|| FailureCause::MissingKey("current.temperature_2m".to_string()))?;
    let code = current
        .weather_code
        .ok_or_else(|| FailureCause::MissingKey("current.weather_code".to_string()))?;

    let observed_at = match current.time.as_deref() {
        Some(raw) => NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
            .map_err(|e| FailureCause::Parse(format!("current.time {:?}: {}", raw, e)))?,
        None => fallback_now,
    };
    let hour = truncate_to_hour(observed_at);

    let hourly = doc
        .hourly
        .ok_or_else(|| FailureCause::MissingKey("hourly".to_string()))?;
    let idx = hourly
        .time
        .iter()
        .position(|t| NaiveDateTime::parse_from_str(t, TIME_FORMAT).ok() == Some(hour))
        .ok_or_else(|| FailureCause::MissingKey(format!("hourly.time[{}]", hour.format(TIME_FORMAT))))?;

    let humidity_pct = hourly
        .relative_humidity_2m
        .get(idx)
        .copied()
        .flatten()
        .ok_or_else(|| FailureCause::MissingKey("hourly.relative_humidity_2m".to_string()))?;
    let precipitation_mm = hourly
        .precipitation
        .get(idx)
        .copied()
        .flatten()
        .ok_or_else(|| FailureCause::MissingKey("hourly.precipitation".to_string()))?;

    debug!(temperature_c, humidity_pct, precipitation_mm, code, "Weather parsed");

    Ok(WeatherSnapshot {
        temperature_c,
        humidity_pct,
        precipitation_mm,
        description: describe_weather_code(code).to_string(),
        observed_at: Some(observed_at),
    })
}

/// WMO weather interpretation code → description (closed set)
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow fall",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}
