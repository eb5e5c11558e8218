//! Scoring gateway
//!
//! The predictor is opaque: it optionally declares the feature order it
//! expects and maps one feature row to a scalar. The gateway resolves the
//! declaration once per cycle, converts percent-scaled output to a ratio,
//! clamps into [0, 1] and turns predictor faults into per-lot
//! [`ScoringFailure`]s.

pub mod linear;

pub use linear::{load_predictor, LinearModel};

use crate::error::{PredictError, ScoringFailure};
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Unit of the predictor's raw output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputScale {
    /// 0..1
    #[default]
    Ratio,
    /// 0..100
    Percent,
}

impl OutputScale {
    fn to_ratio(self, raw: f64) -> f64 {
        match self {
            OutputScale::Ratio => raw,
            OutputScale::Percent => raw / 100.0,
        }
    }
}

pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered feature names, when the artifact declares them
    fn feature_names(&self) -> Option<&[String]>;

    fn output_scale(&self) -> OutputScale {
        OutputScale::Ratio
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError>;
}

/// Predictor plus its capabilities, resolved once per cycle
#[derive(Clone)]
pub struct PredictorDescriptor {
    predictor: Arc<dyn Predictor>,
    feature_order: Option<Vec<String>>,
    scale: OutputScale,
}

impl PredictorDescriptor {
    pub fn resolve(predictor: Arc<dyn Predictor>) -> Self {
        let feature_order = predictor.feature_names().map(<[String]>::to_vec);
        let scale = predictor.output_scale();
        Self {
            predictor,
            feature_order,
            scale,
        }
    }

    pub fn name(&self) -> &str {
        self.predictor.name()
    }

    pub fn feature_order(&self) -> Option<&[String]> {
        self.feature_order.as_deref()
    }

    pub fn scale(&self) -> OutputScale {
        self.scale
    }
}

impl std::fmt::Debug for PredictorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorDescriptor")
            .field("name", &self.name())
            .field("feature_order", &self.feature_order)
            .field("scale", &self.scale)
            .finish()
    }
}

/// Normalized prediction for one lot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyEstimate {
    pub entity: String,
    /// Occupancy ratio in [0, 1]
    pub ratio: f64,
    /// Predictor output before scaling and clamping
    pub raw: f64,
    pub clamped: bool,
}

#[derive(Debug, Clone)]
pub struct ScoringGateway {
    descriptor: PredictorDescriptor,
}

impl ScoringGateway {
    pub fn new(descriptor: PredictorDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn descriptor(&self) -> &PredictorDescriptor {
        &self.descriptor
    }

    pub fn score(&self, vector: &FeatureVector) -> Result<OccupancyEstimate, ScoringFailure> {
        let fail = |cause: String| {
            warn!(lot = %vector.entity, %cause, "Scoring failed");
            ScoringFailure {
                entity: vector.entity.clone(),
                cause,
            }
        };

        let raw = self
            .descriptor
            .predictor
            .predict(vector)
            .map_err(|e| fail(e.to_string()))?;
        if !raw.is_finite() {
            return Err(fail(format!("non-finite prediction {}", raw)));
        }

        let scaled = self.descriptor.scale.to_ratio(raw);
        let ratio = scaled.clamp(0.0, 1.0);
        Ok(OccupancyEstimate {
            entity: vector.entity.clone(),
            ratio,
            raw,
            clamped: ratio != scaled,
        })
    }
}
