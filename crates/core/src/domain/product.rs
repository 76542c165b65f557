use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::ProductSku;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    Growing,
    Declining,
    Stable,
}

impl TrendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Growing => "Growing",
            Self::Declining => "Declining",
            Self::Stable => "Stable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Growing" => Some(Self::Growing),
            "Declining" => Some(Self::Declining),
            "Stable" => Some(Self::Stable),
            _ => None,
        }
    }
}

/// Per-sku performance rollup. Fully recomputed on every run; ratios are
/// `None` whenever their denominator is zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductAggregate {
    pub product_sku: ProductSku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub views: u64,
    pub cart_adds: u64,
    pub checkouts: u64,
    pub purchases: u64,
    pub total_revenue: Decimal,
    pub unique_users: u64,
    pub countries: u64,
    pub device_types: u64,
    pub view_to_purchase_rate: Option<f64>,
    pub view_to_cart_rate: Option<f64>,
    pub cart_to_purchase_rate: Option<f64>,
    pub revenue_per_purchase: Option<f64>,
    pub revenue_per_view: Option<f64>,
    pub first_activity_date: NaiveDate,
    pub last_activity_date: NaiveDate,
    pub trend_correlation: Option<f64>,
    pub trend_status: TrendStatus,
    pub performance_score: f64,
}
