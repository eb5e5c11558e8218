//! Error types for parkcast-live
//!
//! Every failure below the API boundary is recoverable:
//! - [`AdapterFailure`]: one source failed, the coordinator tries the next
//! - [`ScoringFailure`]: the predictor faulted for one lot, other lots proceed
//! - [`CycleCancelled`]: a newer refresh superseded this one
//!
//! Degradations that do not fail anything are reported as [`PipelineWarning`]s.
//! [`ApiError`] is the only type that reaches HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Why a source adapter failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Expected HTML node absent
    #[error("missing node: {0}")]
    MissingNode(String),

    /// Expected JSON key absent
    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Source answered but no row survived validation
    #[error("no usable rows")]
    Empty,
}

/// Typed failure of one source adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("source {source_id} failed: {cause}")]
pub struct AdapterFailure {
    pub source_id: String,
    pub cause: FailureCause,
}

impl AdapterFailure {
    pub fn new(source_id: impl Into<String>, cause: FailureCause) -> Self {
        Self {
            source_id: source_id.into(),
            cause,
        }
    }
}

/// Fault signalled by a predictor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// Row does not have the shape the predictor expects
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("predictor error: {0}")]
    Internal(String),
}

/// Scoring failed for one lot
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("scoring failed for {entity}: {cause}")]
pub struct ScoringFailure {
    pub entity: String,
    pub cause: String,
}

/// Non-blocking degradation surfaced alongside cycle results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// A source failed but a later one in the same category answered
    SourceFailed(AdapterFailure),
    /// Every source of a category failed; defaults were used
    DefaultedFallback {
        category: String,
        failures: Vec<AdapterFailure>,
    },
    /// Lot absent from the metadata table; static fields use sentinels
    MetadataMissing { entity: String },
    /// Predictor expects a field the assembler cannot supply
    FeatureMismatch { entity: String, field: String },
    ScoringFailure(ScoringFailure),
    /// No predictor artifact could be loaded
    NoPredictor,
}

/// The refresh cycle was superseded before it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("refresh cycle cancelled")]
pub struct CycleCancelled;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request superseded by a newer one (409)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<CycleCancelled> for ApiError {
    fn from(err: CycleCancelled) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
