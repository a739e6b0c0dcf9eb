//! Period reconciliation: one canonical record per calendar period
//!
//! Providers emit snapshots irregularly: several per period, none for some
//! periods, and in no particular order. The reconciler collapses such a
//! stream into exactly one record per period in a requested range.

use std::collections::HashMap;

use crate::types::{CanonicalPeriodRecord, Granularity, PeriodKey, RawSnapshot};

/// Reconciler for building gap-free per-period series
pub struct PeriodReconciler;

impl PeriodReconciler {
    /// Reconcile `snapshots` into one record per period in `[start, end]`.
    ///
    /// Output is ascending, gap-free and duplicate-free. An inverted range
    /// (or mismatched granularities) yields an empty series.
    pub fn reconcile(
        snapshots: &[RawSnapshot],
        start: PeriodKey,
        end: PeriodKey,
    ) -> Vec<CanonicalPeriodRecord> {
        if start.granularity() != end.granularity() || start > end {
            return Vec::new();
        }
        let granularity = start.granularity();

        let selected = Self::select_per_period(snapshots, granularity);

        PeriodKey::range(start, end)
            .map(|key| match selected.get(&key) {
                Some(snapshot) => CanonicalPeriodRecord {
                    period_key: key,
                    value: snapshot.period_value(granularity),
                    instantaneous_power_kw: snapshot.instantaneous_power_kw.unwrap_or(0.0),
                    synthesized: false,
                    measured_at: Some(snapshot.measured_at),
                },
                None => CanonicalPeriodRecord::placeholder(key),
            })
            .collect()
    }

    /// Pick the authoritative snapshot for every period that has one.
    ///
    /// Snapshots with a missing, non-positive or unparseable value for the
    /// granularity are never candidates. Within a period a snapshot taken
    /// exactly at the closing instant wins; otherwise the latest one does.
    /// On identical timestamps the first encountered is kept.
    pub fn select_per_period(
        snapshots: &[RawSnapshot],
        granularity: Granularity,
    ) -> HashMap<PeriodKey, &RawSnapshot> {
        let mut selected: HashMap<PeriodKey, &RawSnapshot> = HashMap::new();

        for snapshot in snapshots {
            if snapshot.period_value(granularity) <= 0.0 {
                continue;
            }

            let key = snapshot.period_key(granularity);
            let replace = match selected.get(&key) {
                None => true,
                Some(current) => Self::supersedes(snapshot, current, key),
            };
            if replace {
                selected.insert(key, snapshot);
            }
        }

        selected
    }

    /// Whether `candidate` should replace `current` as the period's record
    fn supersedes(candidate: &RawSnapshot, current: &RawSnapshot, key: PeriodKey) -> bool {
        let closing = key.closing_instant();
        let candidate_closing = closing == Some(candidate.measured_at);
        let current_closing = closing == Some(current.measured_at);

        match (candidate_closing, current_closing) {
            (true, false) => true,
            (false, true) => false,
            // Both at the boundary means identical timestamps: keep first
            (true, true) => false,
            (false, false) => candidate.measured_at > current.measured_at,
        }
    }
}
