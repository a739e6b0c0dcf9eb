//! Concurrent fan-out over all configured providers

use futures::future::join_all;
use std::time::Instant;
use tracing::{info, warn};

use crate::providers::ProviderAdapter;
use crate::services::SummaryBuilder;
use crate::types::{AggregateSummary, ProviderStatus, Result, SuntrackError};

/// Fetches every provider concurrently and isolates per-provider failure
pub struct ParallelAggregator;

impl ParallelAggregator {
    /// One status per adapter, in adapter order.
    ///
    /// All fetches settle before this returns; a failed or timed-out provider
    /// becomes a zeroed `Failed` status and never affects its siblings.
    pub async fn collect(adapters: &[Box<dyn ProviderAdapter>]) -> Vec<ProviderStatus> {
        join_all(adapters.iter().map(|adapter| Self::settle(adapter.as_ref()))).await
    }

    /// Fan out, then reduce to system-wide totals.
    ///
    /// Errors only when there is nothing to aggregate.
    pub async fn aggregate(adapters: &[Box<dyn ProviderAdapter>]) -> Result<AggregateSummary> {
        if adapters.is_empty() {
            return Err(SuntrackError::Aggregate("no providers configured".into()));
        }

        let started = Instant::now();
        let statuses = Self::collect(adapters).await;
        let summary = SummaryBuilder::build(statuses);

        info!(
            providers = summary.providers.len(),
            failed = summary.failed_providers().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregate complete"
        );
        Ok(summary)
    }

    async fn settle(adapter: &dyn ProviderAdapter) -> ProviderStatus {
        let limit = adapter.timeout();
        let outcome = match tokio::time::timeout(limit, adapter.fetch_summary()).await {
            Ok(result) => result,
            Err(_) => Err(SuntrackError::Timeout {
                provider: adapter.name().to_string(),
                secs: limit.as_secs(),
            }),
        };

        match outcome {
            Ok(mut summary) => {
                summary.provider = adapter.kind();
                summary.name = adapter.name().to_string();
                ProviderStatus::Ok { summary }
            }
            Err(e) => {
                warn!(provider = adapter.name(), error = %e, "provider degraded to zero summary");
                ProviderStatus::failed(adapter.kind(), adapter.name(), e)
            }
        }
    }
}
