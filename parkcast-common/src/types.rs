//! Core data model shared by the acquisition pipeline
//!
//! - [`LotMetadata`]: static per-lot row (capacity, district, type, distance, position)
//! - [`LiveObservation`] / [`OccupancyRecords`]: normalized live occupancy readings
//! - [`WeatherSnapshot`]: process-wide weather for one refresh cycle
//! - [`EventContext`]: optional event fields fed to the predictor

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categorical sentinel for static fields of unknown lots
pub const UNKNOWN: &str = "Unknown";

/// Normalize a lot name for cross-source matching
///
/// Sources disagree on casing and spacing ("Altmarkt ", "ALTMARKT",
/// "Altmarkt  Galerie"), so lookups always go through this key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Static metadata for one parking lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotMetadata {
    /// Display name as written in the metadata table
    pub name: String,
    /// Number of spots (0 when unknown)
    pub capacity: u32,
    /// City district
    pub district: String,
    /// Lot type (e.g. "Historic Center", "Park + Ride")
    pub kind: String,
    /// Distance to the nearest other lot in metres
    pub distance_to_nearest: f64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LotMetadata {
    /// Sentinel row used when a lot is absent from the metadata table
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capacity: 0,
            district: UNKNOWN.to_string(),
            kind: UNKNOWN.to_string(),
            distance_to_nearest: 0.0,
            lat: None,
            lon: None,
        }
    }
}

/// One live occupancy reading for a lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveObservation {
    pub name: String,
    /// Capacity reported by the source at observation time
    pub capacity: u32,
    /// Free spots
    pub free: u32,
}

impl LiveObservation {
    pub fn new(name: impl Into<String>, capacity: u32, free: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            free,
        }
    }

    /// Occupancy ratio of this observation, see [`occupancy_ratio`]
    pub fn occupancy_ratio(&self) -> Option<f64> {
        occupancy_ratio(self.capacity, self.free)
    }
}

/// Occupancy ratio `1 - free/capacity`
///
/// `None` when capacity is zero. Feeds occasionally report more free
/// spots than capacity while recounting, so the result is clamped to [0, 1].
pub fn occupancy_ratio(capacity: u32, free: u32) -> Option<f64> {
    if capacity == 0 {
        return None;
    }
    let ratio = 1.0 - f64::from(free) / f64::from(capacity);
    Some(ratio.clamp(0.0, 1.0))
}

/// Source-agnostic set of live observations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OccupancyRecords {
    observations: Vec<LiveObservation>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl OccupancyRecords {
    /// Build from observations; later duplicates of a normalized name are dropped
    pub fn new(observations: Vec<LiveObservation>) -> Self {
        let mut kept = Vec::with_capacity(observations.len());
        let mut index = HashMap::new();
        for obs in observations {
            let key = normalize_name(&obs.name);
            if index.contains_key(&key) {
                tracing::debug!(lot = %obs.name, "Dropping duplicate live observation");
                continue;
            }
            index.insert(key, kept.len());
            kept.push(obs);
        }
        Self {
            observations: kept,
            index,
        }
    }

    /// Look up an observation by (normalized) name
    pub fn find(&self, name: &str) -> Option<&LiveObservation> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| &self.observations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Weather for one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
    pub description: String,
    /// Observation time reported by the source, if any
    pub observed_at: Option<NaiveDateTime>,
}

impl WeatherSnapshot {
    /// Documented defaults used when every weather source fails
    pub fn fallback() -> Self {
        Self {
            temperature_c: 20.0,
            humidity_pct: 50.0,
            precipitation_mm: 0.0,
            description: "Clear".to_string(),
            observed_at: None,
        }
    }
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Event fields for the predictor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// An event is running within the lot's radius
    #[serde(default)]
    pub in_event_window: bool,
    /// Event size category (0 = none)
    #[serde(default)]
    pub event_size: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_case_and_whitespace() {
        assert_eq!(normalize_name("  Altmarkt "), "altmarkt");
        assert_eq!(normalize_name("ALTMARKT\tGalerie"), "altmarkt galerie");
        assert_eq!(normalize_name("Frauenkirche /  Neumarkt"), "frauenkirche / neumarkt");
    }

    #[test]
    fn test_normalize_name_umlauts() {
        assert_eq!(normalize_name("Prager  Straße"), "prager straße");
        assert_eq!(normalize_name("ÄGIDIENPLATZ"), "ägidienplatz");
    }

    #[test]
    fn test_occupancy_ratio() {
        let obs = LiveObservation::new("Altmarkt", 400, 100);
        assert_eq!(obs.occupancy_ratio(), Some(0.75));

        let full = LiveObservation::new("Altmarkt", 400, 0);
        assert_eq!(full.occupancy_ratio(), Some(1.0));

        let empty = LiveObservation::new("Altmarkt", 400, 400);
        assert_eq!(empty.occupancy_ratio(), Some(0.0));
    }

    #[test]
    fn test_occupancy_ratio_zero_capacity_is_undefined() {
        let obs = LiveObservation::new("Closed", 0, 0);
        assert_eq!(obs.occupancy_ratio(), None);
    }

    #[test]
    fn test_occupancy_ratio_free_above_capacity_clamps() {
        let obs = LiveObservation::new("Recount", 100, 130);
        assert_eq!(obs.occupancy_ratio(), Some(0.0));
    }

    #[test]
    fn test_occupancy_ratio_of_reconciled_capacity() {
        // capacity from the metadata table, free count from the feed
        assert_eq!(occupancy_ratio(400, 100), Some(0.75));
        assert_eq!(occupancy_ratio(0, 0), None);
        assert_eq!(occupancy_ratio(100, 130), Some(0.0));
    }

    #[test]
    fn test_occupancy_ratio_in_unit_interval() {
        for capacity in 1..=50u32 {
            for free in 0..=capacity {
                let r = LiveObservation::new("x", capacity, free).occupancy_ratio().unwrap();
                assert!((0.0..=1.0).contains(&r), "ratio {} out of range", r);
                let expected = 1.0 - free as f64 / capacity as f64;
                assert!((r - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_records_find_normalized() {
        let records = OccupancyRecords::new(vec![
            LiveObservation::new("Altmarkt", 400, 100),
            LiveObservation::new("Haus am Zwinger", 200, 50),
        ]);
        assert_eq!(records.find("ALTMARKT").map(|o| o.free), Some(100));
        assert_eq!(records.find(" haus  am zwinger ").map(|o| o.capacity), Some(200));
        assert!(records.find("Unknown Lot").is_none());
    }

    #[test]
    fn test_records_duplicates_keep_first() {
        let records = OccupancyRecords::new(vec![
            LiveObservation::new("Altmarkt", 400, 100),
            LiveObservation::new("altmarkt", 400, 5),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records.find("Altmarkt").map(|o| o.free), Some(100));
    }

    #[test]
    fn test_weather_fallback_values() {
        let w = WeatherSnapshot::fallback();
        assert_eq!(w.temperature_c, 20.0);
        assert_eq!(w.humidity_pct, 50.0);
        assert_eq!(w.precipitation_mm, 0.0);
        assert_eq!(w.description, "Clear");
    }
}
