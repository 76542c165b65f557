use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-customer purchase profile. Only customers with at least one purchase
/// are emitted; the profile feeds the external segmentation collaborator and
/// is never scored internally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub user_id: String,
    pub total_purchases: u64,
    pub total_revenue: Decimal,
    pub avg_order_value: Option<f64>,
    /// Span in days between the customer's first and last interaction of any
    /// kind, inclusive of both endpoints.
    pub days_active: i64,
    pub unique_categories: u64,
    pub device_diversity: u64,
    pub geographic_reach: u64,
}
