//! Revenue trend detection over a product's purchase history.
//!
//! The trend signal is the Pearson correlation between the calendar day of
//! each purchase and the revenue it produced. Too little history is not an
//! error: it degrades to no correlation and a `Stable` classification.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::TrendConfig;
use crate::domain::product::TrendStatus;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrendSummary {
    pub correlation: Option<f64>,
    pub status: TrendStatus,
}

impl TrendSummary {
    pub fn stable() -> Self {
        Self { correlation: None, status: TrendStatus::Stable }
    }
}

/// Classifies a product's revenue trajectory from its `(day, revenue)`
/// purchase points. Fewer than two distinct purchase dates leave the
/// correlation undefined.
pub fn analyze_trend(points: &[(NaiveDate, Decimal)], config: &TrendConfig) -> TrendSummary {
    let mut distinct_dates: Vec<NaiveDate> = points.iter().map(|(date, _)| *date).collect();
    distinct_dates.sort_unstable();
    distinct_dates.dedup();
    if distinct_dates.len() < 2 {
        return TrendSummary::stable();
    }

    let xs: Vec<f64> = points.iter().map(|(date, _)| f64::from(date.num_days_from_ce())).collect();
    let ys: Vec<f64> = points.iter().map(|(_, revenue)| revenue.to_f64().unwrap_or(0.0)).collect();

    let correlation = pearson(&xs, &ys);
    TrendSummary { correlation, status: classify(correlation, config) }
}

fn classify(correlation: Option<f64>, config: &TrendConfig) -> TrendStatus {
    match correlation {
        Some(value) if value > config.growing_threshold => TrendStatus::Growing,
        Some(value) if value < config.declining_threshold => TrendStatus::Declining,
        _ => TrendStatus::Stable,
    }
}

/// Standard Pearson coefficient: covariance over the product of standard
/// deviations, in double precision. `None` when either axis has zero
/// variance or fewer than two samples.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let count = n as f64;
    let mean_x = xs.iter().sum::<f64>() / count;
    let mean_y = ys.iter().sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    let denominator = (variance_x * variance_y).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(covariance / denominator)
}
