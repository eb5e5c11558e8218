//! JSON REST occupancy endpoint
//!
//! Expected payload: `{"parking": [{"name": "...", "max": 400, "free": 100}, ...]}`

use super::{parse_count, HttpFetcher, SourceAdapter};
use crate::error::{AdapterFailure, FailureCause};
use async_trait::async_trait;
use parkcast_common::{LiveObservation, OccupancyRecords};
use serde_json::Value;
use tracing::debug;

pub struct JsonEndpointSource {
    url: String,
    http: HttpFetcher,
}

impl JsonEndpointSource {
    pub fn new(url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for JsonEndpointSource {
    type Output = OccupancyRecords;

    fn source_id(&self) -> &str {
        "json-endpoint"
    }

    async fn fetch(&self) -> Result<OccupancyRecords, AdapterFailure> {
        let body = self.http.get_text(self.source_id(), &self.url).await?;
        parse_parking_json(&body).map_err(|cause| AdapterFailure::new(self.source_id(), cause))
    }
}

/// Parse the endpoint body; rows with a missing name or non-integer counts are skipped
pub fn parse_parking_json(body: &str) -> Result<OccupancyRecords, FailureCause> {
    // The endpoint answers maintenance pages with HTML and status 200
    if !body.trim_start().starts_with('{') {
        return Err(FailureCause::Parse("response is not a JSON object".to_string()));
    }
    let doc: Value = serde_json::from_str(body).map_err(|e| FailureCause::Parse(e.to_string()))?;
    let lots = doc
        .get("parking")
        .ok_or_else(|| FailureCause::MissingKey("parking".to_string()))?
        .as_array()
        .ok_or_else(|| FailureCause::Parse("\"parking\" is not an array".to_string()))?;

    let observations: Vec<LiveObservation> = lots
        .iter()
        .filter_map(|lot| {
            let name = lot.get("name").and_then(Value::as_str).map(str::trim);
            let capacity = lot.get("max").and_then(count_value);
            let free = lot.get("free").and_then(count_value);
            match (name, capacity, free) {
                (Some(name), Some(capacity), Some(free)) if !name.is_empty() => {
                    Some(LiveObservation::new(name, capacity, free))
                }
                _ => {
                    debug!(row = %lot, "Skipping malformed parking row");
                    None
                }
            }
        })
        .collect();

    if observations.is_empty() {
        return Err(FailureCause::Empty);
    }
    Ok(OccupancyRecords::new(observations))
}

fn count_value(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}
