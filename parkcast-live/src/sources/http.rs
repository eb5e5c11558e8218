//! Shared HTTP client for network adapters

use crate::error::{AdapterFailure, FailureCause};
use std::time::Duration;
use tracing::debug;

/// reqwest client with an explicit timeout and user agent
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body of a 2xx response
    pub async fn get_text(&self, source_id: &str, url: &str) -> Result<String, AdapterFailure> {
        debug!(source = source_id, url, "Fetching");
        let fail = |cause| AdapterFailure::new(source_id, cause);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(classify(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(FailureCause::HttpStatus(status.as_u16())));
        }

        response.text().await.map_err(|e| fail(classify(&e)))
    }
}

fn classify(err: &reqwest::Error) -> FailureCause {
    if err.is_timeout() {
        FailureCause::Timeout
    } else if err.is_decode() || err.is_body() {
        FailureCause::Parse(err.to_string())
    } else {
        FailureCause::Network(err.to_string())
    }
}
