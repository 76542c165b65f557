//! Deterministic in-process collaborators.
//!
//! Used by tests and by offline runs where no model service is reachable.
//! Each stub is a pure function of its request, so replaying a run yields
//! identical predictions.

use async_trait::async_trait;
use chrono::Days;
use rust_decimal::prelude::ToPrimitive;

use crate::collaborators::{
    ClassificationOutcome, Classifier, CollaboratorError, CustomerFeatures, EarlyWindowFeatures,
    ForecastPoint, ForecastRequest, Forecaster, SegmentAssignment, Segmenter,
};

/// Projects a flat level equal to the mean of the trailing week, with a
/// fixed ±20% interval.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubForecaster;

#[async_trait]
impl Forecaster for StubForecaster {
    async fn forecast(
        &self,
        request: ForecastRequest,
    ) -> Result<Vec<ForecastPoint>, CollaboratorError> {
        let Some(last) = request.series.last() else {
            return Err(CollaboratorError::Contract(
                "cannot forecast an empty revenue series".to_string(),
            ));
        };

        let tail_len = request.series.len().min(7);
        let tail = &request.series[request.series.len() - tail_len..];
        let level = tail
            .iter()
            .map(|point| point.total_revenue.to_f64().unwrap_or(0.0))
            .sum::<f64>()
            / tail_len as f64;

        let mut points = Vec::with_capacity(request.horizon_days as usize);
        for offset in 1..=u64::from(request.horizon_days) {
            let forecast_date = last
                .date
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| {
                    CollaboratorError::Contract("forecast horizon overflows the calendar".to_string())
                })?;
            points.push(ForecastPoint {
                forecast_date,
                predicted_value: level,
                lower_bound: level * 0.8,
                upper_bound: level * 1.2,
            });
        }
        Ok(points)
    }
}

/// Buckets customers into four fixed spend tiers by purchase count and
/// average order value.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubSegmenter;

#[async_trait]
impl Segmenter for StubSegmenter {
    async fn assign_segments(
        &self,
        customers: Vec<CustomerFeatures>,
    ) -> Result<Vec<SegmentAssignment>, CollaboratorError> {
        Ok(customers
            .into_iter()
            .map(|customer| {
                let cluster_id = match (customer.total_purchases, customer.avg_order_value) {
                    (0..=1, _) => 0,
                    (2..=4, aov) if aov < 100.0 => 1,
                    (2..=4, _) => 2,
                    _ => 3,
                };
                SegmentAssignment { user_id: customer.user_id, cluster_id }
            })
            .collect())
    }
}

/// Labels products by early conversion efficiency.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubClassifier;

impl StubClassifier {
    const HIGH_POTENTIAL_CONVERSION: f64 = 0.05;
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(
        &self,
        products: Vec<EarlyWindowFeatures>,
    ) -> Result<Vec<ClassificationOutcome>, CollaboratorError> {
        Ok(products
            .into_iter()
            .map(|product| {
                let conversion = product.conversion_rate.unwrap_or(0.0);
                let high = conversion >= Self::HIGH_POTENTIAL_CONVERSION;
                ClassificationOutcome {
                    product_sku: product.product_sku,
                    label: if high { "high_potential" } else { "standard" }.to_string(),
                    probability: (0.5 + conversion * 5.0).min(0.99),
                }
            })
            .collect())
    }
}
