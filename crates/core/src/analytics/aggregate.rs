//! Grouping-then-fold aggregation over the validated event stream.
//!
//! One pass builds a mutable accumulator per product key, a second pass
//! derives the null-safe funnel ratios. Every field depends only on the
//! product's own events, so the fold has no cross-product state.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::analytics::trend::TrendSummary;
use crate::domain::customer::CustomerAggregate;
use crate::domain::event::{Event, EventKind, ProductSku};
use crate::domain::product::ProductAggregate;

/// Per-sku rollup before trend analysis and scoring have run. Carries the
/// purchase history the trend analyzer consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductStats {
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
    /// `(day, revenue)` pairs of purchase events that carried a revenue
    /// value, in input order.
    pub purchase_points: Vec<(NaiveDate, Decimal)>,
}

impl ProductStats {
    pub fn into_aggregate(self, trend: TrendSummary, performance_score: f64) -> ProductAggregate {
        ProductAggregate {
            product_sku: self.product_sku,
            product_name: self.product_name,
            category: self.category,
            brand: self.brand,
            views: self.views,
            cart_adds: self.cart_adds,
            checkouts: self.checkouts,
            purchases: self.purchases,
            total_revenue: self.total_revenue,
            unique_users: self.unique_users,
            countries: self.countries,
            device_types: self.device_types,
            view_to_purchase_rate: self.view_to_purchase_rate,
            view_to_cart_rate: self.view_to_cart_rate,
            cart_to_purchase_rate: self.cart_to_purchase_rate,
            revenue_per_purchase: self.revenue_per_purchase,
            revenue_per_view: self.revenue_per_view,
            first_activity_date: self.first_activity_date,
            last_activity_date: self.last_activity_date,
            trend_correlation: trend.correlation,
            trend_status: trend.status,
            performance_score,
        }
    }
}

#[derive(Debug)]
struct ProductAccumulator {
    product_name: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    views: u64,
    cart_adds: u64,
    checkouts: u64,
    purchases: u64,
    total_revenue: Decimal,
    users: HashSet<String>,
    countries: HashSet<String>,
    devices: HashSet<String>,
    first_activity_date: NaiveDate,
    last_activity_date: NaiveDate,
    total_events: u64,
    purchase_points: Vec<(NaiveDate, Decimal)>,
}

impl ProductAccumulator {
    fn new(event: &Event) -> Self {
        let mut accumulator = Self {
            product_name: None,
            category: None,
            brand: None,
            views: 0,
            cart_adds: 0,
            checkouts: 0,
            purchases: 0,
            total_revenue: Decimal::ZERO,
            users: HashSet::new(),
            countries: HashSet::new(),
            devices: HashSet::new(),
            first_activity_date: event.event_date,
            last_activity_date: event.event_date,
            total_events: 0,
            purchase_points: Vec::new(),
        };
        accumulator.fold(event);
        accumulator
    }

    fn fold(&mut self, event: &Event) {
        self.total_events += 1;

        // Representative descriptive fields: first non-null value wins, so
        // the pick is stable for a given input order.
        if self.product_name.is_none() {
            self.product_name = event.product_name.clone();
        }
        if self.category.is_none() {
            self.category = event.category.clone();
        }
        if self.brand.is_none() {
            self.brand = event.brand.clone();
        }

        match event.kind {
            EventKind::ViewItem => self.views += 1,
            EventKind::AddToCart => self.cart_adds += 1,
            EventKind::BeginCheckout => self.checkouts += 1,
            EventKind::Purchase => {
                self.purchases += 1;
                if let Some(revenue) = event.revenue {
                    self.total_revenue += revenue;
                    self.purchase_points.push((event.event_date, revenue));
                }
            }
        }

        if let Some(user_id) = &event.user_id {
            self.users.insert(user_id.clone());
        }
        if let Some(country) = &event.country {
            self.countries.insert(country.clone());
        }
        if let Some(device) = &event.device_category {
            self.devices.insert(device.clone());
        }

        self.first_activity_date = self.first_activity_date.min(event.event_date);
        self.last_activity_date = self.last_activity_date.max(event.event_date);
    }

    fn finish(self, product_sku: ProductSku) -> ProductStats {
        ProductStats {
            product_sku,
            product_name: self.product_name,
            category: self.category,
            brand: self.brand,
            views: self.views,
            cart_adds: self.cart_adds,
            checkouts: self.checkouts,
            purchases: self.purchases,
            total_revenue: self.total_revenue,
            unique_users: self.users.len() as u64,
            countries: self.countries.len() as u64,
            device_types: self.devices.len() as u64,
            view_to_purchase_rate: ratio(self.purchases, self.views),
            view_to_cart_rate: ratio(self.cart_adds, self.views),
            cart_to_purchase_rate: ratio(self.purchases, self.cart_adds),
            revenue_per_purchase: per_unit(self.total_revenue, self.purchases),
            revenue_per_view: per_unit(self.total_revenue, self.views),
            first_activity_date: self.first_activity_date,
            last_activity_date: self.last_activity_date,
            purchase_points: self.purchase_points,
        }
    }
}

/// Rolls the event stream up by sku. Skus with fewer than
/// `min_activity_events` qualifying events of any kind are omitted entirely,
/// not zero-filled. Output is ordered by total revenue descending with sku
/// as the tie break, so identical input yields identical output.
pub fn aggregate_products(events: &[Event], min_activity_events: u64) -> Vec<ProductStats> {
    let mut accumulators: HashMap<ProductSku, ProductAccumulator> = HashMap::new();

    for event in events {
        match accumulators.get_mut(&event.product_sku) {
            Some(accumulator) => accumulator.fold(event),
            None => {
                accumulators.insert(event.product_sku.clone(), ProductAccumulator::new(event));
            }
        }
    }

    let mut stats: Vec<ProductStats> = accumulators
        .into_iter()
        .filter(|(_, accumulator)| accumulator.total_events >= min_activity_events)
        .map(|(sku, accumulator)| accumulator.finish(sku))
        .collect();

    stats.sort_by(|a, b| {
        b.total_revenue.cmp(&a.total_revenue).then_with(|| a.product_sku.cmp(&b.product_sku))
    });
    stats
}

#[derive(Debug)]
struct CustomerAccumulator {
    total_purchases: u64,
    total_revenue: Decimal,
    first_activity_date: NaiveDate,
    last_activity_date: NaiveDate,
    categories: HashSet<String>,
    devices: HashSet<String>,
    countries: HashSet<String>,
}

/// Rolls the event stream up by user. Events without a user id carry no
/// attribution and are skipped; only customers with at least one purchase
/// are emitted.
pub fn aggregate_customers(events: &[Event]) -> Vec<CustomerAggregate> {
    let mut accumulators: HashMap<String, CustomerAccumulator> = HashMap::new();

    for event in events {
        let Some(user_id) = &event.user_id else { continue };

        let accumulator =
            accumulators.entry(user_id.clone()).or_insert_with(|| CustomerAccumulator {
                total_purchases: 0,
                total_revenue: Decimal::ZERO,
                first_activity_date: event.event_date,
                last_activity_date: event.event_date,
                categories: HashSet::new(),
                devices: HashSet::new(),
                countries: HashSet::new(),
            });

        if event.kind == EventKind::Purchase {
            accumulator.total_purchases += 1;
            if let Some(revenue) = event.revenue {
                accumulator.total_revenue += revenue;
            }
        }
        if let Some(category) = &event.category {
            accumulator.categories.insert(category.clone());
        }
        if let Some(device) = &event.device_category {
            accumulator.devices.insert(device.clone());
        }
        if let Some(country) = &event.country {
            accumulator.countries.insert(country.clone());
        }
        accumulator.first_activity_date = accumulator.first_activity_date.min(event.event_date);
        accumulator.last_activity_date = accumulator.last_activity_date.max(event.event_date);
    }

    let mut customers: Vec<CustomerAggregate> = accumulators
        .into_iter()
        .filter(|(_, accumulator)| accumulator.total_purchases > 0)
        .map(|(user_id, accumulator)| CustomerAggregate {
            user_id,
            total_purchases: accumulator.total_purchases,
            total_revenue: accumulator.total_revenue,
            avg_order_value: per_unit(accumulator.total_revenue, accumulator.total_purchases),
            days_active: (accumulator.last_activity_date - accumulator.first_activity_date)
                .num_days()
                + 1,
            unique_categories: accumulator.categories.len() as u64,
            device_diversity: accumulator.devices.len() as u64,
            geographic_reach: accumulator.countries.len() as u64,
        })
        .collect();

    customers.sort_by(|a, b| {
        b.total_revenue.cmp(&a.total_revenue).then_with(|| a.user_id.cmp(&b.user_id))
    });
    customers
}

/// Portfolio-wide `(day, revenue)` series over purchase events, ordered by
/// date ascending. Input to the forecasting collaborator.
pub fn daily_revenue(events: &[Event]) -> Vec<(NaiveDate, Decimal)> {
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for event in events {
        if event.kind == EventKind::Purchase {
            if let Some(revenue) = event.revenue {
                *by_day.entry(event.event_date).or_insert(Decimal::ZERO) += revenue;
            }
        }
    }
    by_day.into_iter().collect()
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn per_unit(amount: Decimal, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| amount.to_f64().unwrap_or(0.0) / denominator as f64)
}
