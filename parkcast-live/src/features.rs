//! Feature assembly
//!
//! Merges the live observation, the cycle's weather, the time context,
//! static metadata and event fields into one ordered row per lot.
//! Assembly never fails: a lot missing from the metadata table gets
//! sentinel static fields, and a field the predictor asks for but the
//! assembler cannot supply becomes [`FeatureValue::Null`]. Both cases are
//! reported as warnings.
//!
//! The assembler reads no clock; identical inputs give identical rows.

use crate::error::PipelineWarning;
use parkcast_common::{
    occupancy_ratio, EventContext, LotMetadata, MetadataTable, OccupancyRecords, TimeContext,
    WeatherSnapshot,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Field order used when the predictor declares none
pub const NATURAL_ORDER: [&str; 17] = [
    "capacity",
    "district",
    "type",
    "distance_to_nearest_parking",
    "free_spots",
    "occupancy",
    "temperature",
    "humidity",
    "rain",
    "description",
    "hour",
    "minute_of_day",
    "weekday",
    "is_weekend",
    "is_holiday",
    "in_event_window",
    "event_size",
];

/// Fields the predictor must treat as categorical
pub const CATEGORICAL_FIELDS: [&str; 3] = ["district", "type", "description"];

/// One typed cell of a feature row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
    /// Unresolvable field
    Null,
}

impl FeatureValue {
    fn flag(b: bool) -> Self {
        FeatureValue::Numeric(if b { 1.0 } else { 0.0 })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

/// Ordered feature row for one lot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub entity: String,
    pub fields: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &FeatureValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Assembled row plus what the pipeline needs to decide on scoring
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeatures {
    pub vector: FeatureVector,
    /// Reconciled capacity (0 excludes the lot from scoring)
    pub capacity: u32,
    pub free_spots: Option<u32>,
    /// Live occupancy ratio against the reconciled capacity
    pub live_ratio: Option<f64>,
    pub metadata: LotMetadata,
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureAssembler {
    events: EventContext,
}

impl FeatureAssembler {
    pub fn new(events: EventContext) -> Self {
        Self { events }
    }

    /// Build the feature row for `entity_id`
    ///
    /// With `feature_order` the row holds exactly those fields in that order;
    /// without it the row follows [`NATURAL_ORDER`].
    pub fn assemble(
        &self,
        entity_id: &str,
        live: &OccupancyRecords,
        weather: &WeatherSnapshot,
        time_ctx: &TimeContext,
        static_meta: &MetadataTable,
        feature_order: Option<&[String]>,
    ) -> AssembledFeatures {
        let mut warnings = Vec::new();

        let metadata = match static_meta.lookup(entity_id) {
            Some(row) => row.clone(),
            None => {
                warn!(lot = entity_id, "Lot missing from metadata table, using sentinels");
                warnings.push(PipelineWarning::MetadataMissing {
                    entity: entity_id.to_string(),
                });
                LotMetadata::unknown(entity_id)
            }
        };

        let observation = live.find(entity_id);
        let capacity = reconcile_capacity(entity_id, metadata.capacity, observation.map(|o| o.capacity));
        let free_spots = observation.map(|o| o.free);
        let live_ratio = free_spots.and_then(|free| occupancy_ratio(capacity, free));

        let merged = self.merged_fields(&metadata, capacity, free_spots, live_ratio, weather, time_ctx);

        let fields = match feature_order {
            None => merged
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            Some(order) => order
                .iter()
                .map(|name| {
                    let value = merged
                        .iter()
                        .find(|(n, _)| *n == name.as_str())
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| {
                            warn!(lot = entity_id, field = %name, "Predictor expects unknown feature, using null");
                            warnings.push(PipelineWarning::FeatureMismatch {
                                entity: entity_id.to_string(),
                                field: name.clone(),
                            });
                            FeatureValue::Null
                        });
                    (name.clone(), value)
                })
                .collect(),
        };

        AssembledFeatures {
            vector: FeatureVector {
                entity: metadata.name.clone(),
                fields,
            },
            capacity,
            free_spots,
            live_ratio,
            metadata,
            warnings,
        }
    }

    fn merged_fields(
        &self,
        meta: &LotMetadata,
        capacity: u32,
        free_spots: Option<u32>,
        live_ratio: Option<f64>,
        weather: &WeatherSnapshot,
        t: &TimeContext,
    ) -> Vec<(&'static str, FeatureValue)> {
        use FeatureValue::{Categorical, Null, Numeric};

        vec![
            ("capacity", Numeric(f64::from(capacity))),
            ("district", Categorical(meta.district.clone())),
            ("type", Categorical(meta.kind.clone())),
            ("distance_to_nearest_parking", Numeric(meta.distance_to_nearest)),
            ("free_spots", free_spots.map_or(Null, |f| Numeric(f64::from(f)))),
            ("occupancy", live_ratio.map_or(Null, Numeric)),
            ("temperature", Numeric(weather.temperature_c)),
            ("humidity", Numeric(weather.humidity_pct)),
            ("rain", Numeric(weather.precipitation_mm)),
            ("description", Categorical(weather.description.clone())),
            ("hour", Numeric(f64::from(t.hour))),
            ("minute_of_day", Numeric(f64::from(t.minute_of_day))),
            ("weekday", Numeric(f64::from(t.weekday))),
            ("is_weekend", FeatureValue::flag(t.is_weekend)),
            ("is_holiday", FeatureValue::flag(t.is_holiday)),
            ("in_event_window", FeatureValue::flag(self.events.in_event_window)),
            ("event_size", Numeric(f64::from(self.events.event_size))),
        ]
    }
}

/// Static capacity wins when known, otherwise the observed one
fn reconcile_capacity(entity: &str, static_capacity: u32, observed: Option<u32>) -> u32 {
    match observed {
        Some(obs) if static_capacity > 0 && obs != static_capacity => {
            debug!(
                lot = entity,
                static_capacity, observed = obs, "Capacity disagreement, keeping static value"
            );
            static_capacity
        }
        Some(obs) if static_capacity == 0 => obs,
        _ => static_capacity,
    }
}
