//! Linear occupancy model loaded from a JSON artifact
//!
//! ```json
//! {
//!   "name": "dresden-linear-v1",
//!   "feature_names": ["hour", "weekday", "district"],
//!   "intercept": 0.12,
//!   "coefficients": { "hour": 0.02, "weekday": -0.01 },
//!   "categorical": { "district": { "Innere Altstadt": 0.15 } },
//!   "output_scale": "ratio"
//! }
//! ```
//!
//! Fields without a coefficient and null cells contribute nothing.

use super::{OutputScale, Predictor};
use crate::error::PredictError;
use crate::features::{FeatureValue, FeatureVector};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub coefficients: HashMap<String, f64>,
    /// Weight per level of each categorical field
    #[serde(default)]
    pub categorical: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    pub output_scale: OutputScale,
}

fn default_name() -> String {
    "linear".to_string()
}

impl LinearModel {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl Predictor for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn output_scale(&self) -> OutputScale {
        self.output_scale
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        if let Some(names) = &self.feature_names {
            if names.len() != features.len() {
                return Err(PredictError::MalformedInput(format!(
                    "{} features, model expects {}",
                    features.len(),
                    names.len()
                )));
            }
        }

        let mut total = self.intercept;
        for (name, value) in &features.fields {
            if !total.is_finite() {
                return Err(PredictError::Internal(format!(
                    "weighted sum diverged before feature {}",
                    name
                )));
            }
            match value {
                FeatureValue::Null => {}
                FeatureValue::Numeric(v) => {
                    if self.categorical.contains_key(name) {
                        return Err(PredictError::MalformedInput(format!(
                            "numeric value in categorical feature {}",
                            name
                        )));
                    }
                    total += self.coefficients.get(name).copied().unwrap_or(0.0) * v;
                }
                FeatureValue::Categorical(level) => {
                    if self.coefficients.contains_key(name) {
                        return Err(PredictError::MalformedInput(format!(
                            "categorical value in numeric feature {}",
                            name
                        )));
                    }
                    total += self
                        .categorical
                        .get(name)
                        .and_then(|levels| levels.get(level))
                        .copied()
                        .unwrap_or(0.0);
                }
            }
        }
        if !total.is_finite() {
            return Err(PredictError::Internal("weighted sum diverged".to_string()));
        }
        Ok(total)
    }
}

/// Load the predictor artifact
///
/// Any problem degrades to `None` ("no predictions available") with a warning.
pub fn load_predictor(path: &Path) -> Option<Arc<dyn Predictor>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Predictor artifact unreadable, no predictions available");
            return None;
        }
    };
    match LinearModel::from_json(&text) {
        Ok(model) => {
            info!(
                path = %path.display(),
                model = %model.name,
                declared_features = model.feature_names.as_ref().map(Vec::len),
                "Predictor loaded"
            );
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Predictor artifact invalid, no predictions available");
            None
        }
    }
}
