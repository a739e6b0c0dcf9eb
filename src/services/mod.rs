//! Services for fetching, reconciling and summarizing telemetry

pub mod aggregator;
pub mod normalizer;
pub mod reconciler;
pub mod summary;
pub mod telemetry;

pub use aggregator::ParallelAggregator;
pub use reconciler::PeriodReconciler;
pub use summary::SummaryBuilder;
pub use telemetry::TelemetryService;
