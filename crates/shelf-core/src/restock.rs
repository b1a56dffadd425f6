//! # Restock Recommendation
//!
//! Turns [`DemandAnalytics`] plus a product's reorder parameters into a
//! recommended order quantity, an urgency band and a confidence score.
//!
//! ## Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Recommended Quantity                               │
//! │                                                                         │
//! │  base      = avgDaily × (leadTime 7 + reviewPeriod 30)                 │
//! │  safety    = peakDaily × safetyStockDays 7                             │
//! │  trendAdj  = base × (trend − 1) × 0.5                                  │
//! │                                                                         │
//! │  total     = ceil5(base + safety + trendAdj)  ── floored at 2×reorder  │
//! │                                                                         │
//! │                      Urgency (first match wins)                         │
//! │                                                                         │
//! │  CRITICAL  days ≤ 3   or stock < reorder / 2                           │
//! │  HIGH      days ≤ 7   or stock < reorder                               │
//! │  MEDIUM    days ≤ 14                                                   │
//! │  LOW       otherwise                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The confidence score is an additive point system clamped to 0..=100.
//! It is a deterministic scoring rule, not a statistical estimate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::{DataQuality, DemandAnalytics};
use crate::types::Product;

/// Days between placing an order and receiving it.
pub const LEAD_TIME_DAYS: i64 = 7;

/// Days of demand a single order should cover.
pub const REVIEW_PERIOD_DAYS: i64 = 30;

/// Days of peak demand held as buffer.
pub const SAFETY_STOCK_DAYS: i64 = 7;

/// Reported when there is no measurable consumption.
pub const NO_CONSUMPTION_DAYS: i64 = 999;

// =============================================================================
// Urgency
// =============================================================================

/// Restocking priority. Ordered by severity: `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Classifies stock position. Reorder level is halved with integer division.
    pub fn classify(days_until_stockout: i64, current_stock: i64, reorder_level: i64) -> Self {
        if days_until_stockout <= 3 || current_stock < reorder_level / 2 {
            Urgency::Critical
        } else if days_until_stockout <= 7 || current_stock < reorder_level {
            Urgency::High
        } else if days_until_stockout <= 14 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Critical => f.write_str("CRITICAL"),
            Urgency::High => f.write_str("HIGH"),
            Urgency::Medium => f.write_str("MEDIUM"),
            Urgency::Low => f.write_str("LOW"),
        }
    }
}

// =============================================================================
// Restock Prediction
// =============================================================================

/// A derived recommendation for one product. Never stored as a system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockPrediction {
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    pub vendor_id: Option<String>,
    pub current_stock: i64,
    pub reorder_level: i64,
    /// Average daily consumption used for the horizon.
    pub consumption_rate: f64,
    pub days_until_stockout: i64,
    pub urgency: Urgency,
    pub recommended_quantity: i64,
    /// 0..=100
    pub confidence: u8,
    pub analytics: DemandAnalytics,
    /// Short human-readable explanation.
    pub rationale: String,
}

/// Builds a recommendation for `product` from its analytics.
///
/// Products whose stored reorder level is unset (≤ 0) use the default of 10.
pub fn recommend(product: &Product, analytics: &DemandAnalytics) -> RestockPrediction {
    let reorder_level = product.effective_reorder_level();
    let rate = analytics.average_daily_consumption;
    let days = days_until_stockout(product.quantity, rate);
    let urgency = Urgency::classify(days, product.quantity, reorder_level);
    let recommended_quantity = recommended_quantity(analytics, reorder_level);
    let confidence = confidence(analytics);

    let rationale = rationale(
        product.quantity,
        reorder_level,
        days,
        recommended_quantity,
        analytics,
    );

    RestockPrediction {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        product_name: product.name.clone(),
        vendor_id: product.vendor_id.clone(),
        current_stock: product.quantity,
        reorder_level,
        consumption_rate: rate,
        days_until_stockout: days,
        urgency,
        recommended_quantity,
        confidence,
        analytics: analytics.clone(),
        rationale,
    }
}

/// `floor(stock / rate)`, or [`NO_CONSUMPTION_DAYS`] when nothing is consumed.
pub fn days_until_stockout(current_stock: i64, daily_rate: f64) -> i64 {
    if daily_rate > 0.0 {
        (current_stock as f64 / daily_rate).floor() as i64
    } else {
        NO_CONSUMPTION_DAYS
    }
}

/// Order quantity rounded up to a multiple of 5 and floored at `2 × reorder_level`.
pub fn recommended_quantity(analytics: &DemandAnalytics, reorder_level: i64) -> i64 {
    let base = analytics.average_daily_consumption * (LEAD_TIME_DAYS + REVIEW_PERIOD_DAYS) as f64;
    let safety = analytics.peak_daily_consumption as f64 * SAFETY_STOCK_DAYS as f64;
    let trend_adjustment = base * (analytics.trend_factor - 1.0) * 0.5;

    let total = base + safety + trend_adjustment;
    let rounded = ((total / 5.0).ceil() * 5.0) as i64;

    rounded.max(2 * reorder_level)
}

/// Additive confidence score, clamped to 0..=100.
pub fn confidence(analytics: &DemandAnalytics) -> u8 {
    let mut score: i32 = 50;

    score += match analytics.transaction_count {
        n if n >= 30 => 20,
        n if n >= 15 => 10,
        n if n >= 5 => 5,
        _ => -10,
    };

    score += match analytics.days_covered {
        d if d >= 60 => 15,
        d if d >= 30 => 10,
        d if d >= 14 => 5,
        _ => -10,
    };

    if analytics.volatility < 0.3 {
        score += 10;
    } else if analytics.volatility > 0.7 {
        score -= 10;
    }

    score += match analytics.data_quality {
        DataQuality::High => 5,
        DataQuality::Medium => 0,
        DataQuality::Low => -15,
    };

    score.clamp(0, 100) as u8
}

/// Orders predictions most urgent first.
///
/// Ties are broken by the shorter stockout horizon, then by product id, so
/// the output order is fully deterministic.
pub fn sort_by_urgency(predictions: &mut [RestockPrediction]) {
    predictions.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.days_until_stockout.cmp(&b.days_until_stockout))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

// =============================================================================
// Rationale
// =============================================================================

fn rationale(
    current_stock: i64,
    reorder_level: i64,
    days: i64,
    recommended: i64,
    analytics: &DemandAnalytics,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if current_stock == 0 {
        parts.push("Out of stock, immediate action required.".into());
    } else if current_stock < reorder_level / 2 {
        parts.push("Critical shortage, stock is below half of the reorder level.".into());
    } else if current_stock < reorder_level {
        parts.push("Stock is below the reorder level.".into());
    } else if current_stock * 5 <= reorder_level * 6 {
        parts.push("Stock is within 20% of the reorder level.".into());
    }

    if days <= 3 {
        parts.push(format!("Stock runs out in {} days at the current rate.", days));
    } else if days <= 7 {
        parts.push(format!("Stock lasts approximately {} days.", days));
    } else if days <= 14 {
        parts.push(format!("Estimated {} days of stock remaining.", days));
    }

    if analytics.trend_factor > 1.2 {
        parts.push(format!(
            "Demand is increasing significantly (+{:.0}%).",
            (analytics.trend_factor - 1.0) * 100.0
        ));
    } else if analytics.trend_factor > 1.1 {
        parts.push("Demand is trending upward.".into());
    } else if analytics.trend_factor < 0.8 {
        parts.push("Demand is decreasing.".into());
    }

    match analytics.data_quality {
        DataQuality::Low => {
            parts.push("Limited history, confidence is reduced.".into());
        }
        DataQuality::High => parts.push("Based on comprehensive history.".into()),
        DataQuality::Medium => {}
    }

    let reason = if recommended > reorder_level * 3 {
        "to buffer peak demand across the lead time"
    } else if recommended > reorder_level * 2 {
        "to cover projected demand and safety stock"
    } else {
        "to restore stock to a safe level"
    };
    parts.push(format!("Order {} units {}.", recommended, reason));

    parts.join(" ")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::analyze;
    use crate::analytics::tests::out_on_day;
    use crate::types::DEFAULT_REORDER_QUANTITY;
    use chrono::Utc;
    use proptest::prelude::*;

    fn product(quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            sku: "SKU-1".into(),
            name: "Widget".into(),
            quantity,
            reorder_level,
            reorder_quantity: DEFAULT_REORDER_QUANTITY,
            vendor_id: Some("v-1".into()),
            unit_price_cents: 250,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_history_recommendation() {
        // quantity 12, reorder 10, defaults: avg 1.0 -> 12 days -> MEDIUM band
        let prediction = recommend(&product(12, 10), &analyze(&[]));

        assert_eq!(prediction.analytics.data_quality, DataQuality::Low);
        assert_eq!(prediction.days_until_stockout, 12);
        assert_eq!(prediction.urgency, Urgency::Medium);
        assert!(prediction.urgency < Urgency::High);
        // base 37 + safety 35 = 72 -> 75
        assert_eq!(prediction.recommended_quantity, 75);
        assert!(prediction.recommended_quantity >= 20);
        // 50 - 10 (count) - 10 (days) + 10 (volatility) - 15 (quality)
        assert_eq!(prediction.confidence, 25);
    }

    #[test]
    fn test_steady_consumption_is_critical() {
        // 30 movements of 2 units spanning exactly 30 days
        let history: Vec<_> = (0..29)
            .chain(std::iter::once(30))
            .enumerate()
            .map(|(i, day)| out_on_day(i, day, 2))
            .collect();
        let analytics = analyze(&history);
        assert_eq!(analytics.days_covered, 30);
        assert!((analytics.average_daily_consumption - 2.0).abs() < 1e-9);

        let prediction = recommend(&product(4, 10), &analytics);
        assert_eq!(prediction.days_until_stockout, 2);
        assert_eq!(prediction.urgency, Urgency::Critical);
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(Urgency::classify(3, 100, 10), Urgency::Critical);
        assert_eq!(Urgency::classify(50, 4, 10), Urgency::Critical);
        // 5 is not < 10 / 2
        assert_eq!(Urgency::classify(50, 5, 10), Urgency::High);
        // integer division: 7 / 2 = 3
        assert_eq!(Urgency::classify(50, 3, 7), Urgency::High);
        assert_eq!(Urgency::classify(7, 100, 10), Urgency::High);
        assert_eq!(Urgency::classify(14, 100, 10), Urgency::Medium);
        assert_eq!(Urgency::classify(15, 100, 10), Urgency::Low);
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Critical > Urgency::High);
        assert!(Urgency::High > Urgency::Medium);
        assert!(Urgency::Medium > Urgency::Low);
    }

    #[test]
    fn test_days_until_stockout() {
        assert_eq!(days_until_stockout(10, 3.0), 3);
        assert_eq!(days_until_stockout(0, 3.0), 0);
        assert_eq!(days_until_stockout(10, 0.0), NO_CONSUMPTION_DAYS);
    }

    #[test]
    fn test_recommended_quantity_trend_and_floor() {
        let analytics = DemandAnalytics {
            average_daily_consumption: 2.0,
            peak_daily_consumption: 4,
            total_consumption: 60,
            transaction_count: 30,
            days_covered: 30,
            trend_factor: 1.5,
            volatility: 0.1,
            data_quality: DataQuality::High,
        };
        // base 74, safety 28, trend 74 * 0.5 * 0.5 = 18.5 -> 120.5 -> 125
        assert_eq!(recommended_quantity(&analytics, 10), 125);
        // floor at 2 × reorder
        assert_eq!(recommended_quantity(&analytics, 100), 200);
    }

    #[test]
    fn test_exact_multiple_of_five_is_kept() {
        let analytics = DemandAnalytics {
            average_daily_consumption: 0.0,
            peak_daily_consumption: 5,
            trend_factor: 1.0,
            ..DemandAnalytics::default()
        };
        // 0 + 35 + 0 = 35
        assert_eq!(recommended_quantity(&analytics, 0), 35);
    }

    #[test]
    fn test_confidence_scoring() {
        let rich = DemandAnalytics {
            average_daily_consumption: 3.0,
            peak_daily_consumption: 6,
            total_consumption: 270,
            transaction_count: 40,
            days_covered: 75,
            trend_factor: 1.0,
            volatility: 0.2,
            data_quality: DataQuality::High,
        };
        // 50 + 20 + 15 + 10 + 5
        assert_eq!(confidence(&rich), 100);

        let noisy = DemandAnalytics {
            transaction_count: 16,
            days_covered: 20,
            volatility: 0.9,
            data_quality: DataQuality::Medium,
            ..rich.clone()
        };
        // 50 + 10 + 5 - 10 + 0
        assert_eq!(confidence(&noisy), 55);

        let middling = DemandAnalytics {
            volatility: 0.5,
            ..noisy
        };
        assert_eq!(confidence(&middling), 65);
    }

    #[test]
    fn test_unset_reorder_level_uses_default() {
        let prediction = recommend(&product(4, 0), &analyze(&[]));
        assert_eq!(prediction.reorder_level, 10);
        assert_eq!(prediction.urgency, Urgency::Critical);
    }

    #[test]
    fn test_sort_by_urgency() {
        let empty = analyze(&[]);
        let mut predictions = vec![
            recommend(&Product { id: "a".into(), ..product(100, 10) }, &empty),
            recommend(&Product { id: "b".into(), ..product(2, 10) }, &empty),
            recommend(&Product { id: "c".into(), ..product(6, 10) }, &empty),
            recommend(&Product { id: "d".into(), ..product(12, 10) }, &empty),
        ];
        sort_by_urgency(&mut predictions);

        let order: Vec<_> = predictions.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "d", "a"]);
        assert_eq!(predictions[0].urgency, Urgency::Critical);
        assert_eq!(predictions[3].urgency, Urgency::Low);
    }

    #[test]
    fn test_rationale_mentions_stock_position() {
        let prediction = recommend(&product(0, 10), &analyze(&[]));
        assert!(prediction.rationale.starts_with("Out of stock"));
        assert!(prediction.rationale.contains("Order 75 units"));
    }

    proptest! {
        #[test]
        fn prop_recommend_is_deterministic_and_bounded(
            stock in 0i64..500,
            reorder in 0i64..100,
            avg in 0.1f64..50.0,
            peak in 0i64..200,
            trend in 0.5f64..2.0,
            volatility in 0.0f64..3.0,
            count in 0usize..100,
            days in 0i64..120,
        ) {
            let analytics = DemandAnalytics {
                average_daily_consumption: avg,
                peak_daily_consumption: peak,
                total_consumption: peak * 3,
                transaction_count: count,
                days_covered: days,
                trend_factor: trend,
                volatility,
                data_quality: DataQuality::assess(count, days),
            };
            let p = product(stock, reorder);
            let a = recommend(&p, &analytics);
            let b = recommend(&p, &analytics);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.confidence <= 100);
            prop_assert!(a.recommended_quantity % 5 == 0 || a.recommended_quantity == 2 * a.reorder_level);
            prop_assert!(a.recommended_quantity >= 2 * a.reorder_level);
        }
    }
}
