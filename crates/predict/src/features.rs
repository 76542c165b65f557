//! Feature-vector extraction from finished aggregates and the validated
//! event stream. Shapes here follow each collaborator's contract, not the
//! internal aggregate layout.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use retailsense_core::domain::customer::CustomerAggregate;
use retailsense_core::domain::event::{Event, EventKind};

use crate::collaborators::{
    CustomerFeatures, DailyRevenuePoint, EarlyWindowFeatures, ForecastRequest,
};

pub fn forecast_request(
    daily_revenue: &[(NaiveDate, Decimal)],
    horizon_days: u32,
) -> ForecastRequest {
    ForecastRequest {
        series: daily_revenue
            .iter()
            .map(|(date, total_revenue)| DailyRevenuePoint {
                date: *date,
                total_revenue: *total_revenue,
            })
            .collect(),
        horizon_days,
    }
}

pub fn customer_features(aggregate: &CustomerAggregate) -> CustomerFeatures {
    CustomerFeatures {
        user_id: aggregate.user_id.clone(),
        total_purchases: aggregate.total_purchases,
        total_revenue: aggregate.total_revenue.to_f64().unwrap_or(0.0),
        avg_order_value: aggregate.avg_order_value.unwrap_or(0.0),
        days_active: aggregate.days_active,
        unique_categories: aggregate.unique_categories,
        device_diversity: aggregate.device_diversity,
        geographic_reach: aggregate.geographic_reach,
    }
}

/// The classifier's early cutoff: the last day of the bounded window that
/// starts at the analysis window's first day.
pub fn early_cutoff(window_start: NaiveDate, early_window_days: u32) -> NaiveDate {
    window_start
        .checked_add_days(Days::new(u64::from(early_window_days.saturating_sub(1))))
        .unwrap_or(window_start)
}

/// Per-sku features over events up to and including `cutoff`. Products with
/// no events inside the early window produce no vector; the merge keeps
/// their prediction fields null.
pub fn early_window_features(events: &[Event], cutoff: NaiveDate) -> Vec<EarlyWindowFeatures> {
    struct EarlyAccumulator {
        views: u64,
        purchases: u64,
        price_sum: Decimal,
        price_count: u64,
        users: std::collections::HashSet<String>,
        countries: std::collections::HashSet<String>,
    }

    let mut accumulators: HashMap<String, EarlyAccumulator> = HashMap::new();
    for event in events {
        if event.event_date > cutoff {
            continue;
        }
        let accumulator = accumulators
            .entry(event.product_sku.0.clone())
            .or_insert_with(|| EarlyAccumulator {
                views: 0,
                purchases: 0,
                price_sum: Decimal::ZERO,
                price_count: 0,
                users: std::collections::HashSet::new(),
                countries: std::collections::HashSet::new(),
            });

        match event.kind {
            EventKind::ViewItem => accumulator.views += 1,
            EventKind::Purchase => accumulator.purchases += 1,
            _ => {}
        }
        accumulator.price_sum += event.price;
        accumulator.price_count += 1;
        if let Some(user_id) = &event.user_id {
            accumulator.users.insert(user_id.clone());
        }
        if let Some(country) = &event.country {
            accumulator.countries.insert(country.clone());
        }
    }

    let mut features: Vec<EarlyWindowFeatures> = accumulators
        .into_iter()
        .map(|(product_sku, accumulator)| EarlyWindowFeatures {
            product_sku,
            views: accumulator.views,
            purchases: accumulator.purchases,
            avg_price: if accumulator.price_count > 0 {
                accumulator.price_sum.to_f64().unwrap_or(0.0) / accumulator.price_count as f64
            } else {
                0.0
            },
            unique_users: accumulator.users.len() as u64,
            countries: accumulator.countries.len() as u64,
            conversion_rate: (accumulator.views > 0)
                .then(|| accumulator.purchases as f64 / accumulator.views as f64),
        })
        .collect();

    features.sort_by(|a, b| a.product_sku.cmp(&b.product_sku));
    features
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use retailsense_core::domain::customer::CustomerAggregate;
    use retailsense_core::domain::event::{Event, EventKind, ProductSku};

    use super::{customer_features, early_cutoff, early_window_features, forecast_request};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).expect("day")
    }

    fn event(sku: &str, kind: EventKind, d: u32) -> Event {
        Event {
            product_sku: ProductSku(sku.to_string()),
            product_name: None,
            category: None,
            brand: None,
            price: Decimal::new(100, 0),
            event_date: day(d),
            user_id: Some("u-1".to_string()),
            kind,
            revenue: (kind == EventKind::Purchase).then(|| Decimal::new(100, 0)),
            country: Some("US".to_string()),
            device_category: None,
        }
    }

    #[test]
    fn forecast_request_preserves_series_order_and_horizon() {
        let series = vec![
            (day(1), Decimal::new(15, 0)),
            (day(3), Decimal::new(30, 0)),
        ];
        let request = forecast_request(&series, 30);
        assert_eq!(request.horizon_days, 30);
        assert_eq!(request.series.len(), 2);
        assert_eq!(request.series[0].date, day(1));
        assert_eq!(request.series[1].total_revenue, Decimal::new(30, 0));
    }

    #[test]
    fn customer_features_mirror_the_aggregate() {
        let aggregate = CustomerAggregate {
            user_id: "buyer".to_string(),
            total_purchases: 3,
            total_revenue: Decimal::new(120, 0),
            avg_order_value: Some(40.0),
            days_active: 10,
            unique_categories: 2,
            device_diversity: 1,
            geographic_reach: 1,
        };

        let features = customer_features(&aggregate);
        assert_eq!(features.user_id, "buyer");
        assert_eq!(features.total_revenue, 120.0);
        assert_eq!(features.avg_order_value, 40.0);
    }

    #[test]
    fn early_cutoff_is_inclusive_of_the_window_start() {
        assert_eq!(early_cutoff(day(1), 14), day(14));
        assert_eq!(early_cutoff(day(1), 1), day(1));
        assert_eq!(early_cutoff(day(1), 0), day(1));
    }

    #[test]
    fn early_window_excludes_later_events() {
        let events = vec![
            event("A", EventKind::ViewItem, 2),
            event("A", EventKind::Purchase, 3),
            event("A", EventKind::ViewItem, 20),
            event("B", EventKind::ViewItem, 18),
        ];

        let features = early_window_features(&events, day(14));
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].product_sku, "A");
        assert_eq!(features[0].views, 1);
        assert_eq!(features[0].purchases, 1);
        assert_eq!(features[0].conversion_rate, Some(1.0));
        assert_eq!(features[0].avg_price, 100.0);
    }

    #[test]
    fn conversion_rate_is_null_without_early_views() {
        let events = vec![event("A", EventKind::Purchase, 2)];
        let features = early_window_features(&events, day(14));
        assert_eq!(features[0].conversion_rate, None);
    }
}
