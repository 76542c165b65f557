//! Category rollups and the executive insights summary derived from a
//! finished run. Pure reshaping of the aggregate collection; nothing here
//! feeds back into scoring.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::product::{ProductAggregate, TrendStatus};

const UNCATEGORIZED: &str = "(uncategorized)";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryRollup {
    pub category: String,
    pub product_count: u64,
    pub category_revenue: Decimal,
    pub avg_conversion_rate: Option<f64>,
    pub total_views: u64,
    pub total_purchases: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrendTally {
    pub growing: u64,
    pub declining: u64,
    pub stable: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InsightsReport {
    pub total_products: u64,
    pub total_revenue: Decimal,
    pub avg_conversion_rate: Option<f64>,
    pub top_category: Option<String>,
    pub best_product: Option<String>,
    pub trends: TrendTally,
}

/// Groups products by their representative category, ordered by category
/// revenue descending. The average conversion rate is the mean over
/// products that have a defined rate.
pub fn category_rollups(products: &[ProductAggregate]) -> Vec<CategoryRollup> {
    #[derive(Default)]
    struct Group {
        product_count: u64,
        revenue: Decimal,
        conversion_sum: f64,
        conversion_count: u64,
        views: u64,
        purchases: u64,
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for product in products {
        let key = product.category.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        let group = groups.entry(key).or_default();
        group.product_count += 1;
        group.revenue += product.total_revenue;
        if let Some(rate) = product.view_to_purchase_rate {
            group.conversion_sum += rate;
            group.conversion_count += 1;
        }
        group.views += product.views;
        group.purchases += product.purchases;
    }

    let mut rollups: Vec<CategoryRollup> = groups
        .into_iter()
        .map(|(category, group)| CategoryRollup {
            category,
            product_count: group.product_count,
            category_revenue: group.revenue,
            avg_conversion_rate: (group.conversion_count > 0)
                .then(|| group.conversion_sum / group.conversion_count as f64),
            total_views: group.views,
            total_purchases: group.purchases,
        })
        .collect();

    rollups.sort_by(|a, b| {
        b.category_revenue.cmp(&a.category_revenue).then_with(|| a.category.cmp(&b.category))
    });
    rollups
}

pub fn insights(products: &[ProductAggregate]) -> InsightsReport {
    let total_revenue = products.iter().map(|p| p.total_revenue).sum::<Decimal>();

    let defined_rates: Vec<f64> =
        products.iter().filter_map(|p| p.view_to_purchase_rate).collect();
    let avg_conversion_rate = (!defined_rates.is_empty())
        .then(|| defined_rates.iter().sum::<f64>() / defined_rates.len() as f64);

    let top_category = category_rollups(products).into_iter().next().map(|r| r.category);

    // Products arrive ordered by revenue, but don't rely on it here.
    let best_product = products
        .iter()
        .max_by(|a, b| {
            a.total_revenue
                .cmp(&b.total_revenue)
                .then_with(|| b.product_sku.cmp(&a.product_sku))
        })
        .map(|p| p.product_name.clone().unwrap_or_else(|| p.product_sku.0.clone()));

    let mut trends = TrendTally::default();
    for product in products {
        match product.trend_status {
            TrendStatus::Growing => trends.growing += 1,
            TrendStatus::Declining => trends.declining += 1,
            TrendStatus::Stable => trends.stable += 1,
        }
    }

    InsightsReport {
        total_products: products.len() as u64,
        total_revenue,
        avg_conversion_rate,
        top_category,
        best_product,
        trends,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::event::ProductSku;
    use crate::domain::product::{ProductAggregate, TrendStatus};

    use super::{category_rollups, insights};

    fn product(
        sku: &str,
        category: Option<&str>,
        revenue: i64,
        conversion: Option<f64>,
        status: TrendStatus,
    ) -> ProductAggregate {
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).expect("day");
        ProductAggregate {
            product_sku: ProductSku(sku.to_string()),
            product_name: Some(format!("{sku} name")),
            category: category.map(str::to_string),
            brand: None,
            views: 100,
            cart_adds: 10,
            checkouts: 5,
            purchases: 3,
            total_revenue: Decimal::new(revenue, 0),
            unique_users: 7,
            countries: 2,
            device_types: 1,
            view_to_purchase_rate: conversion,
            view_to_cart_rate: None,
            cart_to_purchase_rate: None,
            revenue_per_purchase: None,
            revenue_per_view: None,
            first_activity_date: day,
            last_activity_date: day,
            trend_correlation: None,
            trend_status: status,
            performance_score: 0.0,
        }
    }

    #[test]
    fn rollups_group_by_category_and_order_by_revenue() {
        let products = vec![
            product("A", Some("Audio"), 100, Some(0.1), TrendStatus::Stable),
            product("B", Some("Audio"), 50, Some(0.3), TrendStatus::Growing),
            product("C", Some("Wearables"), 400, None, TrendStatus::Declining),
            product("D", None, 10, Some(0.2), TrendStatus::Stable),
        ];

        let rollups = category_rollups(&products);
        assert_eq!(rollups.len(), 3);
        assert_eq!(rollups[0].category, "Wearables");
        assert_eq!(rollups[0].avg_conversion_rate, None);
        assert_eq!(rollups[1].category, "Audio");
        assert_eq!(rollups[1].product_count, 2);
        assert_eq!(rollups[1].category_revenue, Decimal::new(150, 0));
        assert_eq!(rollups[1].avg_conversion_rate, Some(0.2));
        assert_eq!(rollups[2].category, "(uncategorized)");
    }

    #[test]
    fn insights_summarize_the_portfolio() {
        let products = vec![
            product("A", Some("Audio"), 100, Some(0.1), TrendStatus::Growing),
            product("B", Some("Wearables"), 400, Some(0.3), TrendStatus::Stable),
        ];

        let report = insights(&products);
        assert_eq!(report.total_products, 2);
        assert_eq!(report.total_revenue, Decimal::new(500, 0));
        assert_eq!(report.avg_conversion_rate, Some(0.2));
        assert_eq!(report.top_category.as_deref(), Some("Wearables"));
        assert_eq!(report.best_product.as_deref(), Some("B name"));
        assert_eq!(report.trends.growing, 1);
        assert_eq!(report.trends.stable, 1);
    }

    #[test]
    fn insights_on_empty_portfolio_are_all_empty() {
        let report = insights(&[]);
        assert_eq!(report.total_products, 0);
        assert_eq!(report.total_revenue, Decimal::ZERO);
        assert_eq!(report.avg_conversion_rate, None);
        assert_eq!(report.top_category, None);
        assert_eq!(report.best_product, None);
    }
}
