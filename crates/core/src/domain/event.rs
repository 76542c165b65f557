use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductSku(pub String);

/// Funnel stage of a single interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ViewItem,
    AddToCart,
    BeginCheckout,
    Purchase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewItem => "view_item",
            Self::AddToCart => "add_to_cart",
            Self::BeginCheckout => "begin_checkout",
            Self::Purchase => "purchase",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view_item" => Some(Self::ViewItem),
            "add_to_cart" => Some(Self::AddToCart),
            "begin_checkout" => Some(Self::BeginCheckout),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

/// One raw feed row as it arrives from the event export. Every field is
/// optional: the shape is untrusted until the normalizer has seen it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    /// Calendar day in `YYYYMMDD` form.
    pub event_date: Option<String>,
    pub user_id: Option<String>,
    pub event_name: Option<String>,
    pub revenue: Option<Decimal>,
    pub country: Option<String>,
    pub device_category: Option<String>,
}

/// A validated interaction record. Belongs to exactly one product and one
/// day; `revenue` is only present on purchase events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub product_sku: ProductSku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    pub event_date: NaiveDate,
    pub user_id: Option<String>,
    pub kind: EventKind,
    pub revenue: Option<Decimal>,
    pub country: Option<String>,
    pub device_category: Option<String>,
}
