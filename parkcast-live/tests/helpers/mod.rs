//! Shared fixtures for parkcast-live integration tests
//!
//! Everything runs offline: local axum fixture servers stand in for the
//! city endpoints, and unreachable sources point at a closed local port.

#![allow(dead_code)]

use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use parkcast_common::config::ParkcastConfig;
use std::net::SocketAddr;
use std::path::Path;
use tempfile::TempDir;

pub const METADATA_CSV: &str = "\
Parking Lots;Capacity;District;Type;GPS Lat;GPS Lon
Altmarkt;400;Innere Altstadt;Historic Center;51.0502;13.7372
Haus am Zwinger;200;Innere Altstadt;Garage;51.0530;13.7340
Closed Lot;0;Neustadt;Garage;51.0650;13.7500
";

pub const SNAPSHOT_CSV: &str = "\
name,capacity,free
Altmarkt,400,100
Haus am Zwinger,200,150
Neue Garage,120,30
";

/// 0.2 + 0.01*hour + 0.5*occupancy (+0.1 in Innere Altstadt)
pub const MODEL_JSON: &str = r#"{
    "name": "test-linear",
    "intercept": 0.2,
    "coefficients": {"hour": 0.01, "occupancy": 0.5},
    "categorical": {"district": {"Innere Altstadt": 0.1}}
}"#;

pub const PARKING_JSON: &str = r#"{"parking": [
    {"name": "Altmarkt", "max": 400, "free": 100},
    {"name": "Haus am Zwinger", "max": 200, "free": "50"},
    {"name": "Broken", "max": "n/a", "free": 3}
]}"#;

pub const OPEN_METEO_JSON: &str = r#"{
    "current": {"time": "2024-05-15T14:15", "temperature_2m": 18.4, "weather_code": 2},
    "hourly": {
        "time": ["2024-05-15T13:00", "2024-05-15T14:00"],
        "relative_humidity_2m": [70, 72],
        "precipitation": [0.0, 0.4]
    }
}"#;

/// Wednesday 2024-05-15 14:00
pub fn wednesday_14() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

/// URL on a local port nothing listens on
pub fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_fixture(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Config reading occupancy from a snapshot file, with every network
/// source pointed at a closed port
pub fn offline_config(dir: &Path) -> ParkcastConfig {
    std::fs::write(dir.join("coordinates.csv"), METADATA_CSV).unwrap();
    std::fs::write(dir.join("snapshot.csv"), SNAPSHOT_CSV).unwrap();
    std::fs::write(dir.join("trained_model.json"), MODEL_JSON).unwrap();

    let mut config = ParkcastConfig::default();
    config.sources.json_url = Some(closed_port_url("/data.json"));
    config.sources.html_url = None;
    config.sources.static_file = Some(dir.join("snapshot.csv"));
    config.sources.timeout_secs = 2;
    config.sources.cache_ttl_secs = 0;
    config.weather.api_url = Some(closed_port_url("/v1/forecast"));
    config.weather.page_url = None;
    config.paths.metadata = dir.join("coordinates.csv");
    config.paths.model = dir.join("trained_model.json");
    config
}

pub fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}
