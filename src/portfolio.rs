//! Caller-owned working dataset
//!
//! One [`Portfolio`] value holds the snapshot history and the cash-event
//! journal. The parser and analyzer stay pure; every mutation of the
//! collection happens here, under the caller's ownership, so there is no
//! ambient singleton store. Persistence and rendering consume this type from
//! the outside.

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::breakdown::{explain_interval, Breakdown, Thresholds};
use crate::error::{Result, TrackerError};
use crate::models::{Event, PayoutMode, Snapshot};
use crate::report::{parse_report, ExtractionError};

/// Snapshot history plus event journal for a single fund position.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    // Keyed by observation date: inserting on an existing date replaces the
    // prior record wholesale, which is the de-duplication rule.
    snapshots: BTreeMap<NaiveDate, Snapshot>,
    events: Vec<Event>,
    next_event_id: i64,
    thresholds: Thresholds,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Insert a snapshot, replacing any prior observation for the same date.
    /// Returns the replaced record, if there was one.
    pub fn insert_snapshot(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        let replaced = self.snapshots.insert(snapshot.observed_date, snapshot);
        if let Some(old) = &replaced {
            info!(
                "replaced snapshot for {} (was id {})",
                old.observed_date, old.id
            );
        }
        replaced
    }

    /// Parse pasted portal text and merge the resulting snapshot into the
    /// history. Returns the observation date on success; extraction failures
    /// leave the portfolio untouched.
    pub fn ingest_report(&mut self, text: &str) -> std::result::Result<NaiveDate, ExtractionError> {
        let snapshot = parse_report(text)?;
        let date = snapshot.observed_date;
        self.insert_snapshot(snapshot);
        Ok(date)
    }

    pub fn remove_snapshot(&mut self, date: NaiveDate) -> Option<Snapshot> {
        self.snapshots.remove(&date)
    }

    pub fn snapshot_on(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.snapshots.get(&date)
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.values().next_back()
    }

    /// Snapshots in observation-date order.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.values()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Log a deposit. Amounts must be positive; the analyzer itself accepts
    /// whatever was recorded, so this entry point is the gate.
    pub fn log_deposit(
        &mut self,
        date: NaiveDate,
        amount: Decimal,
        note: Option<String>,
    ) -> std::result::Result<i64, TrackerError> {
        self.push_event(Event::deposit(date, amount, note))
    }

    /// Log a dividend with its payout mode and optional NAV override for
    /// reinvestment conversion.
    pub fn log_dividend(
        &mut self,
        date: NaiveDate,
        amount: Decimal,
        payout_mode: PayoutMode,
        nav_override: Option<Decimal>,
        note: Option<String>,
    ) -> std::result::Result<i64, TrackerError> {
        self.push_event(Event::dividend(date, amount, payout_mode, nav_override, note))
    }

    fn push_event(&mut self, mut event: Event) -> std::result::Result<i64, TrackerError> {
        if event.amount <= Decimal::ZERO {
            return Err(TrackerError::NonPositiveAmount(event.amount));
        }
        self.next_event_id += 1;
        let id = self.next_event_id;
        event.id = Some(id);
        debug!("logged {} of {} on {}", event.kind.as_str(), event.amount, event.date);
        self.events.push(event);
        Ok(id)
    }

    pub fn remove_event(&mut self, id: i64) -> Option<Event> {
        let index = self.events.iter().position(|e| e.id == Some(id))?;
        Some(self.events.remove(index))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Explain the value change between two observed dates.
    pub fn explain_between(&self, previous: NaiveDate, current: NaiveDate) -> Result<Breakdown> {
        let prev = self
            .snapshots
            .get(&previous)
            .ok_or(TrackerError::UnknownSnapshotDate(previous))?;
        let curr = self
            .snapshots
            .get(&current)
            .ok_or(TrackerError::UnknownSnapshotDate(current))?;
        let history: Vec<Snapshot> = self.snapshots.values().cloned().collect();
        explain_interval(prev, curr, &self.events, &history, &self.thresholds)
            .with_context(|| format!("failed to explain interval {previous} -> {current}"))
    }

    /// One breakdown per chronologically adjacent snapshot pair, in date
    /// order. This is what the timeline view renders.
    pub fn explain_timeline(&self) -> Result<Vec<Breakdown>> {
        let history: Vec<Snapshot> = self.snapshots.values().cloned().collect();
        self.snapshots
            .values()
            .tuple_windows()
            .map(|(prev, curr)| {
                explain_interval(prev, curr, &self.events, &history, &self.thresholds)
            })
            .collect()
    }
}
