//! Source adapters
//!
//! Each adapter talks to exactly one external source and returns a normalized
//! record or a typed [`AdapterFailure`]. Adapters never panic on bad input:
//! malformed rows are skipped, and anything worse becomes a failure the
//! [`FallbackCoordinator`](crate::fallback::FallbackCoordinator) can act on.
//!
//! # Adapters
//! 1. **json_endpoint** - JSON REST endpoint (occupancy)
//! 2. **html_table** - scraped HTML table (occupancy)
//! 3. **static_file** - local CSV snapshot (occupancy)
//! 4. **open_meteo** - weather REST API
//! 5. **weather_page** - scraped weather page (°F → °C)

pub mod cache;
pub mod html;
pub mod html_table;
pub mod http;
pub mod json_endpoint;
pub mod open_meteo;
pub mod static_file;
pub mod weather_page;

pub use cache::CachedSource;
pub use html_table::HtmlTableSource;
pub use http::HttpFetcher;
pub use json_endpoint::JsonEndpointSource;
pub use open_meteo::OpenMeteoSource;
pub use static_file::StaticFileSource;
pub use weather_page::WeatherPageSource;

use crate::error::AdapterFailure;
use async_trait::async_trait;

/// Tier 1 source adapter
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Normalized record type produced by this adapter
    type Output: Send;

    /// Adapter identifier for logs and provenance
    fn source_id(&self) -> &str;

    /// Fetch and normalize
    ///
    /// # Errors
    /// Returns `AdapterFailure` for timeouts, non-2xx responses, missing
    /// nodes/keys, unparsable payloads or zero usable rows.
    async fn fetch(&self) -> Result<Self::Output, AdapterFailure>;
}

/// Accept a cell as a non-negative integer count (digits only, like `"123"`)
pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

// ============================================================================
// Mock Adapter for Testing
// ============================================================================
