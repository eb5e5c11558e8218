//! Source adapters against local HTTP fixture servers

mod helpers;

use axum::{http::StatusCode, routing::get, Router};
use helpers::*;
use parkcast_live::error::FailureCause;
use parkcast_live::sources::{
    CachedSource, HtmlTableSource, HttpFetcher, JsonEndpointSource, OpenMeteoSource,
    SourceAdapter, WeatherPageSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TABLE_PAGE: &str = r#"<html><body>
<div class="contentsection"><table>
<tr><td>Altmarkt</td><td>400</td><td>100</td></tr>
<tr><td>Haus am Zwinger</td><td>200</td><td>50</td></tr>
</table></div></body></html>"#;

const WEATHER_PAGE: &str = r#"<div class="current-temp"><span class="wu-value wu-value-to">50</span></div>
<lib-display-unit type="humidity"><span class="wu-value wu-value-to">81</span></lib-display-unit>
<lib-display-unit type="rain"><span class="wu-value wu-value-to">1.2</span></lib-display-unit>"#;

fn fetcher(timeout: Duration) -> HttpFetcher {
    HttpFetcher::new(timeout, "parkcast-tests").unwrap()
}

async fn fixture() -> String {
    let router = Router::new()
        .route("/data.json", get(|| async { PARKING_JSON }))
        .route("/maintenance.json", get(|| async { "<html>Wartungsarbeiten</html>" }))
        .route("/index", get(|| async { TABLE_PAGE }))
        .route("/v1/forecast", get(|| async { OPEN_METEO_JSON }))
        .route("/wu", get(|| async { WEATHER_PAGE }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                PARKING_JSON
            }),
        );
    format!("http://{}", spawn_fixture(router).await)
}

#[tokio::test]
async fn test_json_endpoint_success() {
    let base = fixture().await;
    let source = JsonEndpointSource::new(format!("{}/data.json", base), fetcher(Duration::from_secs(2)));

    let records = source.fetch().await.unwrap();
    assert_eq!(records.len(), 2, "row with non-numeric capacity is skipped");
    assert_eq!(records.find("altmarkt").unwrap().free, 100);
    assert_eq!(records.find("Haus am Zwinger").unwrap().free, 50);
}

#[tokio::test]
async fn test_non_2xx_is_http_status() {
    let base = fixture().await;
    let source = JsonEndpointSource::new(format!("{}/broken", base), fetcher(Duration::from_secs(2)));

    let failure = source.fetch().await.unwrap_err();
    assert_eq!(failure.source_id, "json-endpoint");
    assert_eq!(failure.cause, FailureCause::HttpStatus(500));
}

#[tokio::test]
async fn test_html_answer_to_json_request_is_parse_failure() {
    let base = fixture().await;
    let source = JsonEndpointSource::new(
        format!("{}/maintenance.json", base),
        fetcher(Duration::from_secs(2)),
    );
    assert!(matches!(source.fetch().await.unwrap_err().cause, FailureCause::Parse(_)));
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let base = fixture().await;
    let source = JsonEndpointSource::new(format!("{}/slow", base), fetcher(Duration::from_millis(200)));

    let failure = source.fetch().await.unwrap_err();
    assert_eq!(failure.cause, FailureCause::Timeout);
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let source = JsonEndpointSource::new(closed_port_url("/data.json"), fetcher(Duration::from_secs(2)));
    assert!(matches!(source.fetch().await.unwrap_err().cause, FailureCause::Network(_)));
}

#[tokio::test]
async fn test_html_table_scrape() {
    let base = fixture().await;
    let source = HtmlTableSource::new(format!("{}/index", base), fetcher(Duration::from_secs(2)));

    let records = source.fetch().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.find("ALTMARKT").unwrap().occupancy_ratio(), Some(0.75));
}

#[tokio::test]
async fn test_open_meteo_query_and_parse() {
    let base = fixture().await;
    let source = OpenMeteoSource::new(
        format!("{}/v1/forecast", base),
        51.0504,
        13.7373,
        "Europe/Berlin",
        fetcher(Duration::from_secs(2)),
    );

    let weather = source.fetch().await.unwrap();
    assert_eq!(weather.temperature_c, 18.4);
    assert_eq!(weather.humidity_pct, 72.0);
    assert_eq!(weather.precipitation_mm, 0.4);
    assert_eq!(weather.description, "Partly cloudy");
}

#[tokio::test]
async fn test_weather_page_converts_fahrenheit() {
    let base = fixture().await;
    let source = WeatherPageSource::new(format!("{}/wu", base), fetcher(Duration::from_secs(2)));

    let weather = source.fetch().await.unwrap();
    assert!((weather.temperature_c - 10.0).abs() < 1e-9);
    assert_eq!(weather.humidity_pct, 81.0);
    assert_eq!(weather.precipitation_mm, 1.2);
}

#[tokio::test]
async fn test_cache_avoids_second_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/data.json",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                PARKING_JSON
            }
        }),
    );
    let addr = spawn_fixture(router).await;

    let source = CachedSource::new(
        JsonEndpointSource::new(format!("http://{}/data.json", addr), fetcher(Duration::from_secs(2))),
        Duration::from_secs(60),
    );
    source.fetch().await.unwrap();
    source.fetch().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
