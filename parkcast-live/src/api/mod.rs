//! HTTP API handlers for parkcast-live

pub mod health;
pub mod predictions;

pub use health::health_routes;
pub use predictions::prediction_routes;
