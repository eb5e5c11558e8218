//! Time-bounded cache in front of an adapter
//!
//! Only successful fetches are stored. A failure is passed through and
//! leaves any earlier entry untouched, so an upstream outage is retried
//! on the next call once the entry expires.

use super::SourceAdapter;
use crate::error::AdapterFailure;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

pub struct CachedSource<A: SourceAdapter> {
    inner: A,
    ttl: Duration,
    entry: RwLock<Option<(Instant, A::Output)>>,
}

impl<A: SourceAdapter> CachedSource<A> {
    /// Wrap `inner`; a zero `ttl` disables caching
    pub fn new(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A> SourceAdapter for CachedSource<A>
where
    A: SourceAdapter,
    A::Output: Clone + Sync,
{
    type Output = A::Output;

    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch(&self) -> Result<A::Output, AdapterFailure> {
        if self.ttl.is_zero() {
            return self.inner.fetch().await;
        }

        if let Some((stored_at, value)) = self.entry.read().await.as_ref() {
            if stored_at.elapsed() < self.ttl {
                debug!(source = self.source_id(), "Serving cached fetch");
                return Ok(value.clone());
            }
        }

        let value = self.inner.fetch().await?;
        *self.entry.write().await = Some((Instant::now(), value.clone()));
        Ok(value)
    }
}
