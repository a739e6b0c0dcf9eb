//! Provider adapters for solar monitoring platforms
//!
//! Each supported platform is one variant of [`ProviderKind`] with one
//! adapter behind the [`ProviderAdapter`] trait. Adapters hold no mutable
//! state, so a single instance can serve concurrent calls.

mod fusionsolar;
mod growatt;
pub mod http;
mod solis;
pub mod wire;

pub use fusionsolar::FusionSolarAdapter;
pub use growatt::GrowattAdapter;
pub use solis::SolisCloudAdapter;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::{Config, ProviderConfig};
use crate::types::{
    Granularity, ProviderKind, RawSnapshot, ResyncReport, Result, SnapshotQuery,
    UnifiedProviderSummary,
};

/// Uniform contract over one provider account
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Configured name, unique per configuration
    fn name(&self) -> &str;

    /// Upper bound for one full summary pipeline
    fn timeout(&self) -> Duration;

    /// Fetch stations, devices and alarms and fold them into one summary
    async fn fetch_summary(&self) -> Result<UnifiedProviderSummary>;

    /// Period-KPI snapshots for one entity; rows with bad timestamps are dropped
    async fn fetch_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<RawSnapshot>>;

    /// Ask the provider to rebuild its period data for the given entities
    async fn trigger_resync(
        &self,
        granularity: Granularity,
        entity_ids: &[String],
    ) -> Result<ResyncReport>;
}

/// Adapters built from configuration, in configuration order
pub struct ProviderRegistry {
    adapters: Vec<Box<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let adapters = config
            .providers
            .iter()
            .map(|provider| build_adapter(provider, config.default_timeout_secs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { adapters })
    }

    /// Registry over pre-built adapters
    pub fn with_adapters(adapters: Vec<Box<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Box<dyn ProviderAdapter>] {
        &self.adapters
    }

    /// Find an adapter by configured name
    pub fn get(&self, name: &str) -> Option<&dyn ProviderAdapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn build_adapter(config: &ProviderConfig, default_timeout_secs: u64) -> Result<Box<dyn ProviderAdapter>> {
    let timeout = config.timeout(default_timeout_secs);
    Ok(match config.kind {
        ProviderKind::FusionSolar => Box::new(FusionSolarAdapter::new(config, timeout)?),
        ProviderKind::SolisCloud => Box::new(SolisCloudAdapter::new(config, timeout)?),
        ProviderKind::Growatt => Box::new(GrowattAdapter::new(config, timeout)?),
    })
}

/// Keep a secondary sub-fetch result, or log and zero just that bucket
pub(crate) fn degrade<T>(provider: &str, bucket: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(provider, bucket, error = %e, "sub-fetch failed, bucket zeroed");
            None
        }
    }
}

/// Walk 1-based pages until a short page, the reported total, or `max_pages`.
///
/// `fetch_page` returns one page of records and the list total when the API
/// reports one. Hitting `max_pages` keeps what was read and logs a warning.
pub(crate) async fn fetch_all_pages<T, F, Fut>(
    provider: &str,
    page_size: u32,
    max_pages: u32,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<u64>)>>,
{
    let mut records = Vec::new();
    for page_no in 1..=max_pages {
        let (page, total) = fetch_page(page_no).await?;
        let fetched = page.len();
        records.extend(page);

        let reached_total = total.map_or(false, |t| records.len() as u64 >= t);
        if fetched < page_size as usize || reached_total {
            return Ok(records);
        }
    }

    warn!(provider, max_pages, kept = records.len(), "page limit reached, list truncated");
    Ok(records)
}

/// Whether a station passes the configured station filter (empty = all)
pub(crate) fn is_selected(filter: &[String], station_id: &str) -> bool {
    filter.is_empty() || filter.iter().any(|id| id == station_id)
}
