//! suntrack - multi-provider solar telemetry aggregation
//!
//! Fetches station summaries from every configured monitoring provider in
//! parallel, and reconciles irregular KPI snapshots into gap-free
//! day/month/year series.

pub mod config;
pub mod providers;
pub mod services;
pub mod types;
