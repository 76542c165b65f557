//! Composite performance score.
//!
//! A weighted sum over conversion efficiency, revenue efficiency, reach, and
//! trend direction. The score ranks products; it is not a percentage and has
//! no upper clamp.

use crate::analytics::aggregate::ProductStats;
use crate::analytics::trend::TrendSummary;
use crate::config::ScoringConfig;

/// Scores one product rollup. A missing ratio contributes zero rather than
/// disqualifying the product; the trend bonus applies only to a strictly
/// positive correlation. Rounded to two decimals, ties away from zero.
pub fn performance_score(
    stats: &ProductStats,
    trend: &TrendSummary,
    config: &ScoringConfig,
) -> f64 {
    let conversion = stats.view_to_purchase_rate.unwrap_or(0.0) * config.conversion_weight;
    let revenue_efficiency = (stats.revenue_per_view.unwrap_or(0.0)
        / config.revenue_per_view_divisor)
        * config.revenue_weight;
    let reach =
        (stats.unique_users as f64 / config.reach_saturation).min(1.0) * config.reach_weight;
    let trend_bonus = match trend.correlation {
        Some(correlation) if correlation > 0.0 => config.trend_bonus,
        _ => 0.0,
    };

    round_to_cents(conversion + revenue_efficiency + reach + trend_bonus)
}

/// Two-decimal rounding with ties away from zero, matching `f64::round`.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
