//! Raw telemetry snapshots as reported by providers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Granularity, PeriodKey};

/// A provider number that may arrive as a JSON number or as text.
///
/// Any other JSON value lands in `Other` and reads as unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDecimal {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawDecimal {
    /// Parsed value; None for unparseable or non-finite input
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.is_finite().then_some(*n),
            Self::Text(s) => crate::services::normalizer::parse_decimal(s),
            Self::Other(_) => None,
        }
    }

    /// Parsed value, treating anything unparseable as zero
    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

impl From<f64> for RawDecimal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RawDecimal {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Read a possibly-missing provider number as f64 (missing/unparseable → 0)
pub fn decimal_or_zero(value: &Option<RawDecimal>) -> f64 {
    value.as_ref().map(RawDecimal::value_or_zero).unwrap_or(0.0)
}

/// One telemetry reading, already validated for a parseable timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub measured_at: DateTime<Utc>,
    #[serde(default)]
    pub period_values: BTreeMap<Granularity, RawDecimal>,
    #[serde(default)]
    pub instantaneous_power_kw: Option<f64>,
}

impl RawSnapshot {
    pub fn new(measured_at: DateTime<Utc>) -> Self {
        Self {
            measured_at,
            period_values: BTreeMap::new(),
            instantaneous_power_kw: None,
        }
    }

    /// Builder-style setter for one granularity's yield figure
    pub fn with_value(mut self, granularity: Granularity, value: impl Into<RawDecimal>) -> Self {
        self.period_values.insert(granularity, value.into());
        self
    }

    pub fn with_power(mut self, kw: f64) -> Self {
        self.instantaneous_power_kw = Some(kw);
        self
    }

    /// Yield for a granularity; missing or unparseable is 0
    pub fn period_value(&self, granularity: Granularity) -> f64 {
        self.period_values
            .get(&granularity)
            .map(RawDecimal::value_or_zero)
            .unwrap_or(0.0)
    }

    /// Period this snapshot belongs to at the given granularity
    pub fn period_key(&self, granularity: Granularity) -> PeriodKey {
        PeriodKey::containing(self.measured_at, granularity)
    }
}

/// Parameters of a period-KPI query against one provider entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub entity_id: String,
    pub granularity: Granularity,
    pub start: PeriodKey,
    pub end: PeriodKey,
}

impl SnapshotQuery {
    pub fn new(entity_id: impl Into<String>, start: PeriodKey, end: PeriodKey) -> Self {
        Self {
            entity_id: entity_id.into(),
            granularity: start.granularity(),
            start,
            end,
        }
    }

    /// `startDate` query parameter, coarsened to the granularity
    pub fn start_param(&self) -> String {
        self.start.to_string()
    }

    /// `endDate` query parameter.
    ///
    /// For month/year the closing snapshot of `end` is stamped at the start
    /// of the following period, so the upper bound moves one period on.
    pub fn end_param(&self) -> String {
        match self.granularity {
            Granularity::Day => self.end.to_string(),
            Granularity::Month | Granularity::Year => {
                self.end.next().unwrap_or(self.end).to_string()
            }
        }
    }
}
