//! Scraped weather page adapter
//!
//! Fallback for the weather API. The page renders values inside
//! `span.wu-value.wu-value-to` elements below three anchors: the current
//! temperature block (°F), the humidity unit (%) and the rain unit (mm).
//! The page carries no usable condition text, so the description is "Unknown".

use super::html::section_with_attr;
use super::{HttpFetcher, SourceAdapter};
use crate::error::{AdapterFailure, FailureCause};
use async_trait::async_trait;
use parkcast_common::WeatherSnapshot;
use parkcast_common::types::UNKNOWN;

/// Attribute name and value of an anchor element
type Anchor = (&'static str, &'static str);

const TEMPERATURE_ANCHOR: Anchor = ("class", "current-temp");
const HUMIDITY_ANCHOR: Anchor = ("type", "humidity");
const RAIN_ANCHOR: Anchor = ("type", "rain");
const VALUE_CLASS: &str = "wu-value-to";

pub struct WeatherPageSource {
    url: String,
    http: HttpFetcher,
}

impl WeatherPageSource {
    pub fn new(url: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for WeatherPageSource {
    type Output = WeatherSnapshot;

    fn source_id(&self) -> &str {
        "weather-page"
    }

    async fn fetch(&self) -> Result<WeatherSnapshot, AdapterFailure> {
        let body = self.http.get_text(self.source_id(), &self.url).await?;
        parse_weather_page(&body).map_err(|cause| AdapterFailure::new(self.source_id(), cause))
    }
}

/// Extract temperature, humidity and rain from the page markup
pub fn parse_weather_page(html: &str) -> Result<WeatherSnapshot, FailureCause> {
    let fahrenheit = value_below(html, TEMPERATURE_ANCHOR)?;
    let humidity_pct = value_below(html, HUMIDITY_ANCHOR)?;
    let precipitation_mm = value_below(html, RAIN_ANCHOR)?;

    Ok(WeatherSnapshot {
        temperature_c: fahrenheit_to_celsius(fahrenheit),
        humidity_pct,
        precipitation_mm,
        description: UNKNOWN.to_string(),
        observed_at: None,
    })
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn anchor_label((attr, value): Anchor) -> String {
    format!("[{}={}]", attr, value)
}

/// Number inside the first value span after the anchor element
fn value_below(html: &str, anchor: Anchor) -> Result<f64, FailureCause> {
    let (attr, value) = anchor;
    let section = section_with_attr(html, attr, value)
        .ok_or_else(|| FailureCause::MissingNode(anchor_label(anchor)))?;
    let missing_value =
        || FailureCause::MissingNode(format!("{} .{}", anchor_label(anchor), VALUE_CLASS));

    let span = section_with_attr(section, "class", VALUE_CLASS).ok_or_else(missing_value)?;
    let text_start = span.find('>').map(|i| i + 1).ok_or_else(missing_value)?;
    let text_end = span[text_start..]
        .find('<')
        .map(|i| text_start + i)
        .unwrap_or(span.len());

    let raw = span[text_start..text_end].trim();
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            FailureCause::Parse(format!("{}: {:?} is not a number", anchor_label(anchor), raw))
        })
}
