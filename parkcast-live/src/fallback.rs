//! Fallback coordinator
//!
//! Tries the adapters of one category strictly in priority order. The first
//! success wins and later adapters are never called; partial successes are
//! not merged. When every adapter fails the configured default record is
//! returned and the resolution is marked as defaulted.

use crate::error::AdapterFailure;
use crate::sources::SourceAdapter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handle to an adapter producing `T`
pub type DynSource<T> = Arc<dyn SourceAdapter<Output = T>>;

/// Outcome of one coordinator run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution<T> {
    pub value: T,
    /// Adapter that produced `value`; `None` when defaulted
    pub source: Option<String>,
    pub defaulted: bool,
    /// Failures of the adapters tried before the winner (or of all of them)
    pub failures: Vec<AdapterFailure>,
}

pub struct FallbackCoordinator<T> {
    category: &'static str,
    sources: Vec<DynSource<T>>,
    defaults: T,
}

impl<T: Clone + Send> FallbackCoordinator<T> {
    pub fn new(category: &'static str, sources: Vec<DynSource<T>>, defaults: T) -> Self {
        Self {
            category,
            sources,
            defaults,
        }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Adapter ids in priority order
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.source_id().to_string()).collect()
    }

    pub async fn resolve(&self) -> Resolution<T> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.fetch().await {
                Ok(value) => {
                    info!(
                        category = self.category,
                        source = source.source_id(),
                        skipped = failures.len(),
                        "Source resolved"
                    );
                    return Resolution {
                        value,
                        source: Some(source.source_id().to_string()),
                        defaulted: false,
                        failures,
                    };
                }
                Err(failure) => {
                    warn!(
                        category = self.category,
                        source = %failure.source_id,
                        cause = %failure.cause,
                        "Source failed, trying next"
                    );
                    failures.push(failure);
                }
            }
        }

        warn!(
            category = self.category,
            attempted = failures.len(),
            "All sources failed, using defaults"
        );
        Resolution {
            value: self.defaults.clone(),
            source: None,
            defaulted: true,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCause;
    use crate::sources::mock::MockSource;

    fn coordinator(sources: &[Arc<MockSource<u32>>]) -> FallbackCoordinator<u32> {
        let dyn_sources = sources
            .iter()
            .map(|s| s.clone() as DynSource<u32>)
            .collect();
        FallbackCoordinator::new("test", dyn_sources, 99)
    }

    #[tokio::test]
    async fn test_first_success_wins_and_stops() {
        let a = Arc::new(MockSource::failing("a", FailureCause::Timeout));
        let b = Arc::new(MockSource::failing("b", FailureCause::HttpStatus(500)));
        let c = Arc::new(MockSource::ok("c", 3));
        let d = Arc::new(MockSource::ok("d", 4));

        let resolution = coordinator(&[a.clone(), b.clone(), c.clone(), d.clone()])
            .resolve()
            .await;

        assert_eq!(resolution.value, 3);
        assert_eq!(resolution.source.as_deref(), Some("c"));
        assert!(!resolution.defaulted);
        assert_eq!(resolution.failures.len(), 2);
        assert_eq!(resolution.failures[1].cause, FailureCause::HttpStatus(500));
        assert_eq!(
            [a.call_count(), b.call_count(), c.call_count(), d.call_count()],
            [1, 1, 1, 0]
        );
    }

    #[tokio::test]
    async fn test_every_position_of_success() {
        for k in 0..4 {
            let sources: Vec<_> = (0..4)
                .map(|i| {
                    if i < k {
                        Arc::new(MockSource::failing("bad", FailureCause::Empty))
                    } else {
                        Arc::new(MockSource::ok("good", i as u32 * 10))
                    }
                })
                .collect();
            let resolution = coordinator(&sources).resolve().await;
            assert_eq!(resolution.value, k as u32 * 10);
            assert_eq!(resolution.failures.len(), k);
        }
    }

    #[tokio::test]
    async fn test_all_failing_returns_defaults() {
        let a = Arc::new(MockSource::failing("a", FailureCause::Timeout));
        let b = Arc::new(MockSource::failing("b", FailureCause::MissingKey("parking".into())));

        let resolution = coordinator(&[a, b]).resolve().await;

        assert_eq!(resolution.value, 99);
        assert!(resolution.defaulted);
        assert_eq!(resolution.source, None);
        assert_eq!(resolution.failures.len(), 2);
        assert_eq!(resolution.failures[0].source_id, "a");
    }

    #[tokio::test]
    async fn test_no_sources_is_defaulted() {
        let resolution = coordinator(&[]).resolve().await;
        assert_eq!(resolution.value, 99);
        assert!(resolution.defaulted);
        assert!(resolution.failures.is_empty());
    }
}
