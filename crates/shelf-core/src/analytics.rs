//! # Demand Analytics
//!
//! Converts a window of stock movements into consumption statistics.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      analyze(movements)                                 │
//! │                                                                         │
//! │  movements ──► keep OUT only ──► sort by (occurred_at, id)             │
//! │                                        │                                │
//! │            ┌───────────────────────────┼──────────────────────────┐    │
//! │            ▼                           ▼                          ▼    │
//! │   total / daysSpan           bucket by UTC date           split halves │
//! │   = average (≥ 0.1)          ├── peak = max bucket        trend factor │
//! │                              └── volatility = σ / μ       [0.5, 2.0]   │
//! │                                                                         │
//! │   transactionCount + daysSpan ──► data quality (HIGH/MEDIUM/LOW)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function of its input: the clock is never read,
//! so the same slice always yields a bit-identical [`DemandAnalytics`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{MovementDirection, StockMovement};

/// Default look-back window for analytics, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;

/// Average daily consumption never drops below this floor.
pub const MIN_DAILY_CONSUMPTION: f64 = 0.1;

/// Trend factor bounds.
pub const TREND_MIN: f64 = 0.5;
pub const TREND_MAX: f64 = 2.0;

// =============================================================================
// Data Quality
// =============================================================================

/// How much history backs a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

impl DataQuality {
    /// HIGH needs 20 movements over 30 days, MEDIUM 10 over 14.
    pub fn assess(transaction_count: usize, days_span: i64) -> Self {
        if transaction_count >= 20 && days_span >= 30 {
            DataQuality::High
        } else if transaction_count >= 10 && days_span >= 14 {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQuality::High => f.write_str("HIGH"),
            DataQuality::Medium => f.write_str("MEDIUM"),
            DataQuality::Low => f.write_str("LOW"),
        }
    }
}

// =============================================================================
// Demand Analytics
// =============================================================================

/// Consumption statistics over a window of OUT movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandAnalytics {
    pub average_daily_consumption: f64,
    pub peak_daily_consumption: i64,
    pub total_consumption: i64,
    /// Number of OUT movements considered.
    pub transaction_count: usize,
    /// Whole days between first and last movement (min 1), 0 with no data.
    pub days_covered: i64,
    pub trend_factor: f64,
    pub volatility: f64,
    pub data_quality: DataQuality,
}

impl Default for DemandAnalytics {
    /// The result for a product with no consumption history.
    fn default() -> Self {
        DemandAnalytics {
            average_daily_consumption: 1.0,
            peak_daily_consumption: 5,
            total_consumption: 0,
            transaction_count: 0,
            days_covered: 0,
            trend_factor: 1.0,
            volatility: 0.0,
            data_quality: DataQuality::Low,
        }
    }
}

/// Analyzes a movement history.
///
/// IN movements are ignored, so callers may pass the raw ledger history.
///
/// ```rust
/// use shelf_core::analytics::{analyze, DataQuality};
///
/// let analytics = analyze(&[]);
/// assert_eq!(analytics.average_daily_consumption, 1.0);
/// assert_eq!(analytics.data_quality, DataQuality::Low);
/// ```
pub fn analyze(movements: &[StockMovement]) -> DemandAnalytics {
    let mut outs: Vec<&StockMovement> = movements
        .iter()
        .filter(|m| m.direction == MovementDirection::Out)
        .collect();

    if outs.is_empty() {
        return DemandAnalytics::default();
    }

    // Stable order so ties never depend on the caller's ordering
    outs.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let total: i64 = outs.iter().map(|m| m.quantity).sum();
    let first = outs[0].occurred_at;
    let last = outs[outs.len() - 1].occurred_at;
    let days_span = (last - first).num_days().max(1);

    let average = (total as f64 / days_span as f64).max(MIN_DAILY_CONSUMPTION);

    let buckets = daily_buckets(&outs);
    let peak = buckets.values().copied().max().unwrap_or(0);

    DemandAnalytics {
        average_daily_consumption: average,
        peak_daily_consumption: peak,
        total_consumption: total,
        transaction_count: outs.len(),
        days_covered: days_span,
        trend_factor: trend_factor(&outs),
        volatility: volatility(&buckets),
        data_quality: DataQuality::assess(outs.len(), days_span),
    }
}

/// Analyzes only the movements inside `(as_of - window_days, as_of]`.
pub fn analyze_window(
    movements: &[StockMovement],
    as_of: DateTime<Utc>,
    window_days: i64,
) -> DemandAnalytics {
    let window_start = window_start(as_of, window_days);
    let in_window: Vec<StockMovement> = movements
        .iter()
        .filter(|m| m.occurred_at > window_start && m.occurred_at <= as_of)
        .cloned()
        .collect();
    analyze(&in_window)
}

/// First instant excluded from a window ending at `as_of`.
pub fn window_start(as_of: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    as_of - Duration::days(window_days.max(1))
}

// =============================================================================
// Helpers
// =============================================================================

/// Units out per UTC calendar day.
fn daily_buckets(outs: &[&StockMovement]) -> BTreeMap<NaiveDate, i64> {
    let mut buckets = BTreeMap::new();
    for movement in outs {
        *buckets.entry(movement.occurred_at.date_naive()).or_insert(0) += movement.quantity;
    }
    buckets
}

/// Second-half average over first-half average of the sorted movement list.
fn trend_factor(outs: &[&StockMovement]) -> f64 {
    if outs.len() < 3 {
        return 1.0;
    }

    let mid = outs.len() / 2;
    let first_avg = mean(outs[..mid].iter().map(|m| m.quantity as f64));
    let second_avg = mean(outs[mid..].iter().map(|m| m.quantity as f64));

    if first_avg == 0.0 {
        return 1.0;
    }

    (second_avg / first_avg).clamp(TREND_MIN, TREND_MAX)
}

/// Coefficient of variation of the daily bucket totals.
fn volatility(buckets: &BTreeMap<NaiveDate, i64>) -> f64 {
    if buckets.len() < 2 {
        return 0.0;
    }

    let values: Vec<f64> = buckets.values().map(|v| *v as f64).collect();
    let mu = mean(values.iter().copied());
    if mu == 0.0 {
        return 0.0;
    }

    let variance = mean(values.iter().map(|v| (v - mu).powi(2)));
    variance.sqrt() / mu
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
