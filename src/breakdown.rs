//! Interval breakdown
//!
//! Explains how the fund's value moved between two observations by
//! reconciling the unit-count change against the logged cash events in the
//! half-open interval `(previous, current]`, then classifying the move
//! (market drift, deposit, dividend reinvestment, cash payout) and
//! quantifying any unexplained residual.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::models::{Event, EventKind, PayoutMode, Snapshot};

/// Classification of why the value moved between two observations.
///
/// Ordering of the rules is deliberate: logged explanations win over
/// unexplained unit drift, and a deposit wins over a reinvestment when both
/// land in the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakdownTag {
    /// Units changed and a deposit was logged in the interval.
    DepositExecuted,
    /// Units changed and a reinvested dividend was logged.
    DividendReinvested,
    /// Units held steady while a cash dividend was paid out.
    DividendCashPayout,
    /// Units moved but no matching event was logged.
    UnloggedUnitChange,
    /// Value moved (or didn't) purely from price, unit count unchanged.
    MarketMove,
}

/// Tolerances for unit-change detection and cashflow reconciliation.
///
/// The defaults mirror the portal tracker these reports come from; neither
/// constant has a principled derivation, so both stay configurable rather
/// than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Unit deltas at or below this magnitude count as "no unit change".
    pub unit_epsilon: Decimal,
    /// Residual gaps above this magnitude raise the unmatched-cashflow flag.
    pub gap_tolerance: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            unit_epsilon: Decimal::new(1, 9), // 1e-9 units
            gap_tolerance: Decimal::TWO,      // 2 monetary units
        }
    }
}

/// Attributed explanation of the value delta over one snapshot interval.
/// All fields are plain values; formatting belongs to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub tag: BreakdownTag,
    pub delta_value: Decimal,
    pub delta_units: Decimal,
    pub delta_nav: Decimal,
    /// Unit-count delta priced at the current NAV: the money that must have
    /// moved if those units settled today. An approximation - real
    /// transactions settle at historical NAV.
    pub implied_cashflow: Decimal,
    /// Value change from price movement alone, on the units held at the
    /// interval start.
    pub market_effect: Decimal,
    pub deposits: Decimal,
    pub cash_dividends: Decimal,
    pub reinvest_dividends: Decimal,
    /// Deposits plus reinvested dividends - the cash inflow the journal
    /// accounts for.
    pub logged_cashflow: Decimal,
    /// Estimated units acquired by reinvested dividends, at each event's
    /// resolved NAV.
    pub reinvested_units: Decimal,
    /// Set when implied and logged cashflow disagree by more than the gap
    /// tolerance: settlement timing, NAV estimation error, or an event the
    /// user forgot to log.
    pub unmatched_cashflow: Option<Decimal>,
}

/// Explain the value change from `previous` to `current`.
///
/// `events` is the full journal; the half-open interval filter
/// `(previous.observed_date, current.observed_date]` is applied here, once.
/// `history` is the full snapshot collection, consulted only to resolve the
/// NAV for reinvested dividends. Rejects a non-increasing date pair loudly -
/// that is a caller bug, not a degenerate interval.
pub fn explain_interval(
    previous: &Snapshot,
    current: &Snapshot,
    events: &[Event],
    history: &[Snapshot],
    thresholds: &Thresholds,
) -> Result<Breakdown> {
    if previous.observed_date >= current.observed_date {
        return Err(TrackerError::IntervalOrder {
            previous: previous.observed_date,
            current: current.observed_date,
        }
        .into());
    }

    let delta_value = current.total_value - previous.total_value;
    let delta_units = current.total_units - previous.total_units;
    let delta_nav = current.nav_per_unit - previous.nav_per_unit;
    let implied_cashflow = delta_units * current.nav_per_unit;
    let market_effect = previous.total_units * delta_nav;

    let mut deposits = Decimal::ZERO;
    let mut cash_dividends = Decimal::ZERO;
    let mut reinvest_dividends = Decimal::ZERO;
    let mut reinvested_units = Decimal::ZERO;

    let in_interval = |event: &&Event| {
        event.date > previous.observed_date && event.date <= current.observed_date
    };
    for event in events.iter().filter(in_interval) {
        match event.kind {
            EventKind::Deposit => deposits += event.amount,
            EventKind::Dividend => match event.payout_mode.unwrap_or(PayoutMode::Cash) {
                PayoutMode::Cash => cash_dividends += event.amount,
                PayoutMode::Reinvest => {
                    reinvest_dividends += event.amount;
                    let nav = resolve_reinvest_nav(event, history, current);
                    if nav > Decimal::ZERO {
                        reinvested_units += event.amount / nav;
                    }
                }
            },
        }
    }

    let units_moved = delta_units.abs() > thresholds.unit_epsilon;
    let tag = if units_moved && deposits > Decimal::ZERO {
        BreakdownTag::DepositExecuted
    } else if units_moved && reinvest_dividends > Decimal::ZERO {
        BreakdownTag::DividendReinvested
    } else if !units_moved && cash_dividends > Decimal::ZERO {
        BreakdownTag::DividendCashPayout
    } else if units_moved {
        BreakdownTag::UnloggedUnitChange
    } else {
        BreakdownTag::MarketMove
    };

    let logged_cashflow = deposits + reinvest_dividends;
    let gap = implied_cashflow - logged_cashflow;
    let unmatched_cashflow = (gap.abs() > thresholds.gap_tolerance).then_some(gap);

    debug!(
        "interval {} -> {}: {:?}, delta_value {}, gap {}",
        previous.observed_date, current.observed_date, tag, delta_value, gap
    );

    Ok(Breakdown {
        tag,
        delta_value,
        delta_units,
        delta_nav,
        implied_cashflow,
        market_effect,
        deposits,
        cash_dividends,
        reinvest_dividends,
        logged_cashflow,
        reinvested_units,
        unmatched_cashflow,
    })
}

/// NAV used to convert a reinvested dividend amount into units: the event's
/// override when recorded, else the latest snapshot observed at or before the
/// event date, else the interval's ending NAV. The last fallback can misstate
/// history when the event predates every snapshot; the behavior is kept
/// because nothing in the source data pins down a better one.
fn resolve_reinvest_nav(event: &Event, history: &[Snapshot], current: &Snapshot) -> Decimal {
    if let Some(nav) = event.nav_override {
        return nav;
    }
    history
        .iter()
        .filter(|s| s.observed_date <= event.date)
        .max_by_key(|s| s.observed_date)
        .map(|s| s.nav_per_unit)
        .unwrap_or(current.nav_per_unit)
}
