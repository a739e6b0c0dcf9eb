//! Telemetry facade used by the CLI
//!
//! Stateless: every call performs a fresh fetch, so callers own any caching
//! or refresh interval.

use std::future::Future;
use tracing::{debug, info};

use crate::config::Config;
use crate::providers::{ProviderAdapter, ProviderRegistry};
use crate::services::{ParallelAggregator, PeriodReconciler};
use crate::types::{
    AggregateSummary, CanonicalPeriodRecord, Granularity, PeriodKey, ResyncReport, Result,
    SnapshotQuery, SuntrackError,
};

pub struct TelemetryService {
    registry: ProviderRegistry,
}

impl TelemetryService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(ProviderRegistry::from_config(config)?))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Cross-provider summary; partial provider failure degrades, never errors
    pub async fn aggregate(&self) -> Result<AggregateSummary> {
        ParallelAggregator::aggregate(self.registry.adapters()).await
    }

    /// Gap-free period series for one entity of one provider.
    ///
    /// An inverted range, or keys that do not match `granularity`, returns an
    /// empty series without contacting the provider.
    pub async fn reconcile(
        &self,
        provider: &str,
        entity_id: &str,
        granularity: Granularity,
        start: PeriodKey,
        end: PeriodKey,
    ) -> Result<Vec<CanonicalPeriodRecord>> {
        let adapter = self.adapter(provider)?;
        if start.granularity() != granularity || end.granularity() != granularity || start > end {
            debug!(provider, %start, %end, "empty period range");
            return Ok(Vec::new());
        }

        let query = SnapshotQuery::new(entity_id, start, end);
        let snapshots = with_timeout(adapter, adapter.fetch_snapshots(&query)).await?;
        debug!(provider, entity_id, snapshots = snapshots.len(), "snapshots fetched");

        Ok(PeriodReconciler::reconcile(&snapshots, start, end))
    }

    /// Trigger a provider-side resync; callers re-query afterwards
    pub async fn resync(
        &self,
        provider: &str,
        granularity: Granularity,
        entity_ids: &[String],
    ) -> Result<ResyncReport> {
        let adapter = self.adapter(provider)?;
        if entity_ids.is_empty() {
            return Err(SuntrackError::Parse("resync needs at least one entity id".into()));
        }

        let report = with_timeout(adapter, adapter.trigger_resync(granularity, entity_ids)).await?;
        info!(
            provider,
            %granularity,
            status = ?report.status,
            processed = report.processed,
            failed = report.failed,
            "resync finished"
        );
        Ok(report)
    }

    fn adapter(&self, name: &str) -> Result<&dyn ProviderAdapter> {
        self.registry
            .get(name)
            .ok_or_else(|| SuntrackError::Config(format!("unknown provider '{}'", name)))
    }
}

async fn with_timeout<T, F>(adapter: &dyn ProviderAdapter, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let limit = adapter.timeout();
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| SuntrackError::Timeout {
            provider: adapter.name().to_string(),
            secs: limit.as_secs(),
        })?
}
