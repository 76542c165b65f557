//! Collaborator contracts: one narrow trait per external prediction
//! service, plus the wire types each request/response carries. Concrete
//! implementations (HTTP clients, deterministic stubs, cached replays) are
//! interchangeable behind these traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator request failed: {0}")]
    Transport(String),
    #[error("collaborator request timed out")]
    Timeout,
    #[error("collaborator response violated its contract: {0}")]
    Contract(String),
}

/// One day of portfolio revenue, input to the forecaster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenuePoint {
    pub date: NaiveDate,
    pub total_revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub series: Vec<DailyRevenuePoint>,
    pub horizon_days: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub forecast_date: NaiveDate,
    pub predicted_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Feature vector for one customer, mirroring the CustomerAggregate fields
/// the segmentation model was trained on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub user_id: String,
    pub total_purchases: u64,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub days_active: i64,
    pub unique_categories: u64,
    pub device_diversity: u64,
    pub geographic_reach: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub user_id: String,
    pub cluster_id: u32,
}

/// Product features restricted to a bounded early date window, not the full
/// history. The classifier judges launch potential from early signals only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EarlyWindowFeatures {
    pub product_sku: String,
    pub views: u64,
    pub purchases: u64,
    pub avg_price: f64,
    pub unique_users: u64,
    pub countries: u64,
    pub conversion_rate: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub product_sku: String,
    pub label: String,
    pub probability: f64,
}

/// Time-series revenue forecasting. The response must cover exactly the
/// requested horizon, ordered by date ascending.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(
        &self,
        request: ForecastRequest,
    ) -> Result<Vec<ForecastPoint>, CollaboratorError>;
}

/// Customer segmentation. The response is keyed by customer id; order is not
/// significant.
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn assign_segments(
        &self,
        customers: Vec<CustomerFeatures>,
    ) -> Result<Vec<SegmentAssignment>, CollaboratorError>;
}

/// Early-window product classification: one `(label, probability)` pair per
/// input product, keyed by sku.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        products: Vec<EarlyWindowFeatures>,
    ) -> Result<Vec<ClassificationOutcome>, CollaboratorError>;
}
