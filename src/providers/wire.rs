//! Wire records shared by every provider API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::normalizer::{self, Severity};
use crate::types::{AlarmCounts, Granularity, RawDecimal, RawSnapshot};

/// Timestamp as text or epoch milliseconds; anything else never parses
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
    Other(serde_json::Value),
}

impl RawTimestamp {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => normalizer::from_epoch_millis(*ms),
            Self::Text(text) => normalizer::parse_timestamp(text),
            Self::Other(_) => None,
        }
    }
}

/// Identifier or status code sent as either a number or text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One row of a period-KPI query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    #[serde(default)]
    pub measured_at: Option<RawTimestamp>,
    #[serde(default)]
    pub daily_yield_kwh: Option<RawDecimal>,
    #[serde(default)]
    pub monthly_yield_kwh: Option<RawDecimal>,
    #[serde(default)]
    pub yearly_yield_kwh: Option<RawDecimal>,
    #[serde(default)]
    pub current_power_kw: Option<RawDecimal>,
}

impl KpiRecord {
    /// Convert to a snapshot; None when the timestamp is missing or unparseable
    pub fn into_snapshot(self) -> Option<RawSnapshot> {
        let measured_at = self.measured_at.as_ref()?.parse()?;
        let mut snapshot = RawSnapshot::new(measured_at);

        for (granularity, value) in [
            (Granularity::Day, self.daily_yield_kwh),
            (Granularity::Month, self.monthly_yield_kwh),
            (Granularity::Year, self.yearly_yield_kwh),
        ] {
            if let Some(value) = value {
                snapshot.period_values.insert(granularity, value);
            }
        }
        snapshot.instantaneous_power_kw = self.current_power_kw.and_then(|p| p.value());

        Some(snapshot)
    }
}

/// Convert KPI rows, dropping those without a usable timestamp
pub fn snapshots_from_records(provider: &str, records: Vec<KpiRecord>) -> Vec<RawSnapshot> {
    let total = records.len();
    let snapshots: Vec<RawSnapshot> = records
        .into_iter()
        .filter_map(|record| {
            let raw = record.measured_at.clone();
            let snapshot = record.into_snapshot();
            if snapshot.is_none() {
                debug!(provider, measured_at = ?raw, "dropping KPI record with invalid timestamp");
            }
            snapshot
        })
        .collect();

    if snapshots.len() < total {
        debug!(
            provider,
            kept = snapshots.len(),
            dropped = total - snapshots.len(),
            "KPI records normalized"
        );
    }
    snapshots
}

/// One row of an alarms query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlarmRecord {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub status: String,
}

/// Count active alarms by severity; inactive alarms are ignored
pub fn count_active_alarms(records: &[AlarmRecord]) -> AlarmCounts {
    let mut counts = AlarmCounts::default();
    for record in records.iter().filter(|r| normalizer::is_active_status(&r.status)) {
        match normalizer::classify_severity(&record.severity) {
            Severity::Critical => counts.critical += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Other => counts.other += 1,
        }
    }
    counts
}

/// Body of a resync trigger
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncRequest<'a> {
    pub granularity: Granularity,
    pub entity_ids: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(json: &str) -> KpiRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_kpi_record_text_values() {
        let snapshot = record(
            r#"{"measuredAt":"2024-03-20T12:00:00Z","dailyYieldKwh":"18.4","monthlyYieldKwh":"80","currentPowerKw":"2.5"}"#,
        )
        .into_snapshot()
        .unwrap();

        assert_eq!(
            snapshot.measured_at,
            Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
        );
        assert_eq!(snapshot.period_value(Granularity::Day), 18.4);
        assert_eq!(snapshot.period_value(Granularity::Month), 80.0);
        assert_eq!(snapshot.period_value(Granularity::Year), 0.0);
        assert_eq!(snapshot.instantaneous_power_kw, Some(2.5));
    }

    #[test]
    fn test_kpi_record_epoch_millis_and_numbers() {
        let snapshot = record(r#"{"measuredAt":1711929600000,"monthlyYieldKwh":95.0}"#)
            .into_snapshot()
            .unwrap();
        assert_eq!(
            snapshot.measured_at,
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(snapshot.period_value(Granularity::Month), 95.0);
        assert!(snapshot.instantaneous_power_kw.is_none());
    }

    #[test]
    fn test_kpi_record_unparseable_value_kept_as_zero() {
        let snapshot = record(r#"{"measuredAt":"2024-03-20","dailyYieldKwh":"--"}"#)
            .into_snapshot()
            .unwrap();
        assert_eq!(snapshot.period_value(Granularity::Day), 0.0);
    }

    #[test]
    fn test_snapshots_from_records_drops_bad_timestamps() {
        let records = vec![
            record(r#"{"measuredAt":"2024-03-20T12:00:00Z","dailyYieldKwh":"1"}"#),
            record(r#"{"measuredAt":"not a date","dailyYieldKwh":"2"}"#),
            record(r#"{"dailyYieldKwh":"3"}"#),
        ];
        let snapshots = snapshots_from_records("test", records);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].period_value(Granularity::Day), 1.0);
    }

    #[test]
    fn test_wrong_typed_fields_do_not_fail_the_batch() {
        let records: Vec<KpiRecord> = serde_json::from_str(
            r#"[
                {"measuredAt":"2024-03-20T00:00:00Z","monthlyYieldKwh":"80"},
                {"measuredAt":1711929600000.0,"monthlyYieldKwh":"95"},
                {"measuredAt":"2024-03-31T00:00:00Z","monthlyYieldKwh":true},
                {"measuredAt":{"ts":1},"monthlyYieldKwh":"99"}
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 4);

        let snapshots = snapshots_from_records("test", records);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].period_value(Granularity::Month), 80.0);
        assert_eq!(snapshots[1].period_value(Granularity::Month), 0.0);
    }

    #[test]
    fn test_count_active_alarms() {
        let alarms: Vec<AlarmRecord> = serde_json::from_str(
            r#"[
                {"severity":"critical","status":"active"},
                {"severity":"warning","status":"active"},
                {"severity":"warning","status":"cleared"},
                {"severity":"info","status":"active"},
                {"status":"active"}
            ]"#,
        )
        .unwrap();
        let counts = count_active_alarms(&alarms);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.warning, 1);
        assert_eq!(counts.other, 2);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_resync_request_serializes_camel_case() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let body = ResyncRequest {
            granularity: Granularity::Month,
            entity_ids: &ids,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["granularity"], "monthly");
        assert_eq!(json["entityIds"][1], "b");
    }
}
