use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A point-in-time observation of the fund position, extracted from pasted
/// portal text. Immutable after construction; the parser either fills every
/// core field or builds nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque identifier, derived from the normalized source text at creation.
    pub id: String,
    /// Authoritative key for ordering and event attribution. Unique within a
    /// collection; a later snapshot for the same date replaces the earlier one.
    pub observed_date: NaiveDate,
    /// Fund price per unit (NAVPU) at the observation date.
    pub nav_per_unit: Decimal,
    pub total_units: Decimal,
    /// Monetary value as reported. Extracted independently of units x NAVPU
    /// and may diverge slightly from it due to portal rounding.
    pub total_value: Decimal,
    /// Informational only; never used in attribution.
    pub one_year_return_pct: Decimal,
    pub pending_buy: Decimal,
    pub pending_sell: Decimal,
    /// Raw pasted input (trimmed, CR-normalized), kept for audit.
    pub source_text: String,
}

/// Kind of user-logged cash event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Deposit,
    Dividend,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposit => "DEPOSIT",
            EventKind::Dividend => "DIVIDEND",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(EventKind::Deposit),
            "DIVIDEND" => Ok(EventKind::Dividend),
            _ => Err(()),
        }
    }
}

/// How a dividend was paid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutMode {
    /// Paid out as cash; unit count unchanged.
    Cash,
    /// Converted back into units at the resolved NAV.
    Reinvest,
}

impl PayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMode::Cash => "CASH",
            PayoutMode::Reinvest => "REINVEST",
        }
    }
}

impl FromStr for PayoutMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PayoutMode::Cash),
            "REINVEST" => Ok(PayoutMode::Reinvest),
            _ => Err(()),
        }
    }
}

/// A user-logged cash-affecting action. Events reference no snapshot directly;
/// attribution happens by date-range membership at analysis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the journal on insert.
    pub id: Option<i64>,
    pub kind: EventKind,
    pub date: NaiveDate,
    pub amount: Decimal,
    /// Dividends only. A dividend recorded without one analyzes as cash.
    pub payout_mode: Option<PayoutMode>,
    /// Dividends only: NAV to use when converting a reinvested amount to
    /// units, overriding the inferred snapshot NAV.
    pub nav_override: Option<Decimal>,
    /// Free text, no semantic effect.
    pub note: Option<String>,
}

impl Event {
    pub fn deposit(date: NaiveDate, amount: Decimal, note: Option<String>) -> Self {
        Self {
            id: None,
            kind: EventKind::Deposit,
            date,
            amount,
            payout_mode: None,
            nav_override: None,
            note,
        }
    }

    pub fn dividend(
        date: NaiveDate,
        amount: Decimal,
        payout_mode: PayoutMode,
        nav_override: Option<Decimal>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: None,
            kind: EventKind::Dividend,
            date,
            amount,
            payout_mode: Some(payout_mode),
            nav_override,
            note,
        }
    }
}
