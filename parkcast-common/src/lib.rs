//! # Parkcast Common Library
//!
//! Shared code for the parkcast crates including:
//! - Data model for parking lots, live observations and weather
//! - Static metadata table loading
//! - Time context derivation and the regional holiday calendar
//! - Configuration loading

pub mod config;
pub mod error;
pub mod holidays;
pub mod metadata;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use holidays::HolidayCalendar;
pub use metadata::MetadataTable;
pub use time::TimeContext;
pub use types::{
    normalize_name, occupancy_ratio, EventContext, LiveObservation, LotMetadata, OccupancyRecords,
    WeatherSnapshot,
};
