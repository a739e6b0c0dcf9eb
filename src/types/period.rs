//! Calendar periods and canonical per-period records

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::{Result, SuntrackError};

/// Rollup granularity for period reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[serde(rename = "daily", alias = "day")]
    Day,
    #[serde(rename = "monthly", alias = "month")]
    Month,
    #[serde(rename = "yearly", alias = "year")]
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Month, Granularity::Year];

    /// Wire name used by provider query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "daily",
            Self::Month => "monthly",
            Self::Year => "yearly",
        }
    }

    /// Column label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Month => "Month",
            Self::Year => "Year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SuntrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Self::Day),
            "m" | "month" | "monthly" => Ok(Self::Month),
            "y" | "year" | "yearly" => Ok(Self::Year),
            other => Err(SuntrackError::Parse(format!("unknown granularity '{}'", other))),
        }
    }
}

/// Identifier of one calendar bucket (day, month or year), keyed by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    start: NaiveDate,
    granularity: Granularity,
}

impl PeriodKey {
    /// Period of the given granularity that contains `date`
    pub fn from_date(date: NaiveDate, granularity: Granularity) -> Self {
        let start = match granularity {
            Granularity::Day => date,
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        };
        Self { start, granularity }
    }

    /// Derive the period a snapshot timestamp belongs to (UTC calendar).
    ///
    /// For month and year granularity, an instant exactly at a period's
    /// closing instant (00:00:00 on the first day of the next period)
    /// belongs to the period it closes. The daily closing instant is noon
    /// of the same day, so days need no adjustment.
    pub fn containing(ts: DateTime<Utc>, granularity: Granularity) -> Self {
        let key = Self::from_date(ts.date_naive(), granularity);
        match granularity {
            Granularity::Day => key,
            Granularity::Month | Granularity::Year => {
                if ts == key.start_instant() {
                    key.prev().unwrap_or(key)
                } else {
                    key
                }
            }
        }
    }

    /// Parse `YYYY-MM-DD`, `YYYY-MM` or `YYYY` depending on granularity
    pub fn parse(text: &str, granularity: Granularity) -> Result<Self> {
        let text = text.trim();
        let invalid = || {
            SuntrackError::Parse(format!(
                "invalid {} period '{}'",
                granularity.label().to_lowercase(),
                text
            ))
        };

        let start = match granularity {
            Granularity::Day => {
                NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?
            }
            Granularity::Month => {
                let (year, month) = text.split_once('-').ok_or_else(invalid)?;
                if year.len() != 4 || month.len() != 2 {
                    return Err(invalid());
                }
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?
            }
            Granularity::Year => {
                if text.len() != 4 {
                    return Err(invalid());
                }
                let year: i32 = text.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?
            }
        };

        Ok(Self { start, granularity })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// First calendar day of the period
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// 00:00:00 UTC on the first day of the period
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Instant at which a finalized snapshot for this period is taken.
    ///
    /// Day: 12:00:00 UTC the same day. Month/year: start of the next period.
    pub fn closing_instant(&self) -> Option<DateTime<Utc>> {
        match self.granularity {
            Granularity::Day => self.start.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc()),
            Granularity::Month | Granularity::Year => self.next().map(|n| n.start_instant()),
        }
    }

    /// Following period of the same granularity
    pub fn next(&self) -> Option<Self> {
        let start = match self.granularity {
            Granularity::Day => self.start.succ_opt(),
            Granularity::Month => self.start.checked_add_months(Months::new(1)),
            Granularity::Year => self.start.checked_add_months(Months::new(12)),
        }?;
        Some(Self {
            start,
            granularity: self.granularity,
        })
    }

    /// Preceding period of the same granularity
    pub fn prev(&self) -> Option<Self> {
        let start = match self.granularity {
            Granularity::Day => self.start.pred_opt(),
            Granularity::Month => self.start.checked_sub_months(Months::new(1)),
            Granularity::Year => self.start.checked_sub_months(Months::new(12)),
        }?;
        Some(Self {
            start,
            granularity: self.granularity,
        })
    }

    /// Inclusive iterator over `[start, end]`. Empty when inverted or when
    /// the granularities differ.
    pub fn range(start: PeriodKey, end: PeriodKey) -> PeriodRange {
        let next = (start.granularity == end.granularity && start <= end).then_some(start);
        PeriodRange { next, end }
    }

    /// Number of periods in `[start, end]`
    pub fn count(start: PeriodKey, end: PeriodKey) -> usize {
        if start.granularity != end.granularity || start > end {
            return 0;
        }
        let (a, b) = (start.start, end.start);
        let n = match start.granularity {
            Granularity::Day => (b - a).num_days(),
            Granularity::Month => {
                (b.year() as i64 * 12 + b.month0() as i64) - (a.year() as i64 * 12 + a.month0() as i64)
            }
            Granularity::Year => (b.year() - a.year()) as i64,
        };
        n as usize + 1
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Day => write!(f, "{}", self.start.format("%Y-%m-%d")),
            Granularity::Month => write!(f, "{}", self.start.format("%Y-%m")),
            Granularity::Year => write!(f, "{:04}", self.start.year()),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Iterator returned by [`PeriodKey::range`]
#[derive(Debug, Clone)]
pub struct PeriodRange {
    next: Option<PeriodKey>,
    end: PeriodKey,
}

impl Iterator for PeriodRange {
    type Item = PeriodKey;

    fn next(&mut self) -> Option<PeriodKey> {
        let current = self.next?;
        self.next = current.next().filter(|n| *n <= self.end);
        Some(current)
    }
}

/// The single authoritative record for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalPeriodRecord {
    pub period_key: PeriodKey,
    pub value: f64,
    pub instantaneous_power_kw: f64,
    pub synthesized: bool,
    /// Timestamp of the selected snapshot, None when synthesized
    pub measured_at: Option<DateTime<Utc>>,
}

impl CanonicalPeriodRecord {
    /// Zero-valued placeholder for a period with no usable snapshot
    pub fn placeholder(period_key: PeriodKey) -> Self {
        Self {
            period_key,
            value: 0.0,
            instantaneous_power_kw: 0.0,
            synthesized: true,
            measured_at: None,
        }
    }
}

/// Headline numbers over a reconciled series
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStats {
    pub total_kwh: f64,
    /// Average over real (non-synthesized) periods
    pub average_kwh: f64,
    pub peak_period: Option<(PeriodKey, f64)>,
    pub real_periods: u32,
    pub synthesized_periods: u32,
}

impl PeriodStats {
    pub fn from_records(records: &[CanonicalPeriodRecord]) -> Self {
        let mut total_kwh = 0.0;
        let mut real_periods: u32 = 0;
        let mut synthesized_periods: u32 = 0;
        let mut peak_period: Option<(PeriodKey, f64)> = None;

        for record in records {
            if record.synthesized {
                synthesized_periods = synthesized_periods.saturating_add(1);
                continue;
            }
            real_periods = real_periods.saturating_add(1);
            total_kwh += record.value;

            match &peak_period {
                None => peak_period = Some((record.period_key, record.value)),
                Some((_, max)) if record.value > *max => {
                    peak_period = Some((record.period_key, record.value));
                }
                _ => {}
            }
        }

        let average_kwh = if real_periods == 0 {
            0.0
        } else {
            total_kwh / real_periods as f64
        };

        Self {
            total_kwh,
            average_kwh,
            peak_period,
            real_periods,
            synthesized_periods,
        }
    }

    /// Share of periods backed by a real snapshot (0.0 when empty)
    pub fn coverage(&self) -> f64 {
        let all = self.real_periods + self.synthesized_periods;
        if all == 0 {
            0.0
        } else {
            self.real_periods as f64 / all as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn month(text: &str) -> PeriodKey {
        PeriodKey::parse(text, Granularity::Month).unwrap()
    }

    fn day(text: &str) -> PeriodKey {
        PeriodKey::parse(text, Granularity::Day).unwrap()
    }

    // ========== Granularity ==========

    #[test]
    fn test_granularity_from_str_aliases() {
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("Daily".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("m".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!("yearly".parse::<Granularity>().unwrap(), Granularity::Year);
        assert!("weekly".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_granularity_serde_wire_names() {
        let json = serde_json::to_string(&Granularity::Month).unwrap();
        assert_eq!(json, "\"monthly\"");
        let parsed: Granularity = serde_json::from_str("\"year\"").unwrap();
        assert_eq!(parsed, Granularity::Year);
    }

    // ========== parse / display ==========

    #[test]
    fn test_parse_and_display_each_granularity() {
        assert_eq!(day("2024-02-29").to_string(), "2024-02-29");
        assert_eq!(month("2024-03").to_string(), "2024-03");
        assert_eq!(
            PeriodKey::parse("2024", Granularity::Year)
                .unwrap()
                .to_string(),
            "2024"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PeriodKey::parse("2024-13", Granularity::Month).is_err());
        assert!(PeriodKey::parse("2024-3", Granularity::Month).is_err());
        assert!(PeriodKey::parse("24", Granularity::Year).is_err());
        assert!(PeriodKey::parse("2023-02-29", Granularity::Day).is_err());
        assert!(PeriodKey::parse("", Granularity::Day).is_err());
    }

    // ========== containing ==========

    #[test]
    fn test_containing_mid_period() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 15, 9, 30, 0).unwrap();
        assert_eq!(PeriodKey::containing(ts, Granularity::Day), day("2024-02-15"));
        assert_eq!(PeriodKey::containing(ts, Granularity::Month), month("2024-02"));
        assert_eq!(
            PeriodKey::containing(ts, Granularity::Year).to_string(),
            "2024"
        );
    }

    #[test]
    fn test_containing_month_closing_instant_belongs_to_previous_month() {
        let ts = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(PeriodKey::containing(ts, Granularity::Month), month("2024-03"));
        // One second later it is April's
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 1).unwrap();
        assert_eq!(PeriodKey::containing(later, Granularity::Month), month("2024-04"));
    }

    #[test]
    fn test_containing_year_closing_instant_belongs_to_previous_year() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            PeriodKey::containing(ts, Granularity::Year).to_string(),
            "2023"
        );
        // For monthly rollups the same instant closes December
        assert_eq!(PeriodKey::containing(ts, Granularity::Month), month("2023-12"));
    }

    #[test]
    fn test_containing_day_midnight_stays_on_its_day() {
        let ts = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(PeriodKey::containing(ts, Granularity::Day), day("2024-04-01"));
    }

    // ========== closing_instant ==========

    #[test]
    fn test_closing_instants() {
        assert_eq!(
            day("2024-03-20").closing_instant(),
            Some(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap())
        );
        assert_eq!(
            month("2024-12").closing_instant(),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            PeriodKey::parse("2024", Granularity::Year)
                .unwrap()
                .closing_instant(),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_closing_instant_maps_back_to_same_period() {
        for key in [day("2024-02-29"), month("2024-02"), month("2023-12")] {
            let closing = key.closing_instant().unwrap();
            assert_eq!(PeriodKey::containing(closing, key.granularity()), key);
        }
    }

    // ========== range / count ==========

    #[test]
    fn test_range_months_across_year_boundary() {
        let keys: Vec<String> = PeriodKey::range(month("2023-11"), month("2024-02"))
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(PeriodKey::count(month("2023-11"), month("2024-02")), 4);
    }

    #[test]
    fn test_range_days_leap_february() {
        let start = day("2024-02-27");
        let end = day("2024-03-01");
        assert_eq!(PeriodKey::range(start, end).count(), 4);
        assert_eq!(PeriodKey::count(start, end), 4);
    }

    #[test]
    fn test_range_single_period() {
        let m = month("2024-05");
        assert_eq!(PeriodKey::range(m, m).count(), 1);
        assert_eq!(PeriodKey::count(m, m), 1);
    }

    #[test]
    fn test_range_inverted_is_empty() {
        assert_eq!(PeriodKey::range(month("2024-03"), month("2024-01")).count(), 0);
        assert_eq!(PeriodKey::count(month("2024-03"), month("2024-01")), 0);
    }

    #[test]
    fn test_range_mixed_granularity_is_empty() {
        assert_eq!(PeriodKey::range(day("2024-01-01"), month("2024-03")).count(), 0);
        assert_eq!(PeriodKey::count(day("2024-01-01"), month("2024-03")), 0);
    }

    #[test]
    fn test_serialize_as_display_string() {
        let json = serde_json::to_string(&month("2024-07")).unwrap();
        assert_eq!(json, "\"2024-07\"");
    }

    // ========== PeriodStats ==========

    fn record(key: PeriodKey, value: f64, synthesized: bool) -> CanonicalPeriodRecord {
        CanonicalPeriodRecord {
            period_key: key,
            value,
            instantaneous_power_kw: 0.0,
            synthesized,
            measured_at: None,
        }
    }

    #[test]
    fn test_period_stats_empty() {
        let stats = PeriodStats::from_records(&[]);
        assert!((stats.total_kwh - 0.0).abs() < f64::EPSILON);
        assert!(stats.peak_period.is_none());
        assert_eq!(stats.real_periods, 0);
        assert!((stats.coverage() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_period_stats_ignores_placeholders_for_average() {
        let records = vec![
            record(month("2024-01"), 0.0, true),
            record(month("2024-02"), 50.0, false),
            record(month("2024-03"), 70.0, false),
            record(month("2024-04"), 0.0, true),
        ];
        let stats = PeriodStats::from_records(&records);

        assert!((stats.total_kwh - 120.0).abs() < f64::EPSILON);
        assert!((stats.average_kwh - 60.0).abs() < f64::EPSILON);
        assert_eq!(stats.peak_period, Some((month("2024-03"), 70.0)));
        assert_eq!(stats.real_periods, 2);
        assert_eq!(stats.synthesized_periods, 2);
        assert!((stats.coverage() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_period_stats_peak_tie_keeps_first() {
        let records = vec![
            record(day("2024-06-01"), 30.0, false),
            record(day("2024-06-02"), 30.0, false),
        ];
        let stats = PeriodStats::from_records(&records);
        assert_eq!(stats.peak_period, Some((day("2024-06-01"), 30.0)));
    }
}
