//! Navtrack - UITF fund position tracker core
//!
//! This library turns free-form status text pasted from a fund portal into
//! structured snapshots, and explains how the position's value moved between
//! any two observations by reconciling unit-count changes against a
//! user-maintained journal of deposits and dividends.
//!
//! The parser ([`report`]) and analyzer ([`breakdown`]) are pure functions;
//! [`portfolio::Portfolio`] is the caller-owned collection that feeds them.
//! Storage, rendering and import/export encodings live outside this crate.

pub mod breakdown;
pub mod error;
pub mod models;
pub mod portfolio;
pub mod report;
