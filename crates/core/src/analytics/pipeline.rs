//! Stage orchestration: normalize, aggregate, trend, score.
//!
//! A run is a total recomputation. It consumes one immutable raw event set
//! and produces one complete output collection; nothing is patched in place.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::analytics::aggregate::{aggregate_customers, aggregate_products, daily_revenue};
use crate::analytics::normalize::{normalize, ExclusionStats};
use crate::analytics::score::performance_score;
use crate::analytics::snapshot::AnalyticsSnapshot;
use crate::analytics::trend::analyze_trend;
use crate::config::{AppConfig, ConfigError, DateWindow, ScoringConfig, TrendConfig};
use crate::domain::customer::CustomerAggregate;
use crate::domain::event::{Event, RawEvent};
use crate::domain::product::ProductAggregate;

#[derive(Clone, Debug)]
pub struct AnalyticsPipeline {
    window: DateWindow,
    min_activity_events: u64,
    trend: TrendConfig,
    scoring: ScoringConfig,
}

/// Everything one run produced. `events` is the validated input the
/// prediction adapter extracts feature vectors from; the aggregate
/// collections are the published artifact.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub events: Vec<Event>,
    pub products: Vec<ProductAggregate>,
    pub customers: Vec<CustomerAggregate>,
    pub daily_revenue: Vec<(NaiveDate, Decimal)>,
    pub exclusions: ExclusionStats,
}

impl PipelineRun {
    pub fn into_snapshot(self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            products: self.products,
            customers: self.customers,
            exclusions: self.exclusions,
        }
    }
}

impl AnalyticsPipeline {
    pub fn new(
        window: DateWindow,
        min_activity_events: u64,
        trend: TrendConfig,
        scoring: ScoringConfig,
    ) -> Self {
        Self { window, min_activity_events, trend, scoring }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.ingest.date_window()?,
            config.ingest.min_activity_events,
            config.trend,
            config.scoring,
        ))
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn run(&self, rows: Vec<RawEvent>) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let row_count = rows.len();

        let (events, exclusions) = normalize(rows, &self.window);
        info!(
            event_name = "analytics.normalize.finished",
            run_id = %run_id,
            rows = row_count,
            kept = events.len(),
            excluded = exclusions.total(),
            "normalized raw event rows"
        );

        let products: Vec<ProductAggregate> = aggregate_products(&events, self.min_activity_events)
            .into_iter()
            .map(|stats| {
                let trend = analyze_trend(&stats.purchase_points, &self.trend);
                let score = performance_score(&stats, &trend, &self.scoring);
                stats.into_aggregate(trend, score)
            })
            .collect();

        let customers = aggregate_customers(&events);
        let daily_revenue = daily_revenue(&events);

        info!(
            event_name = "analytics.pipeline.finished",
            run_id = %run_id,
            products = products.len(),
            customers = customers.len(),
            revenue_days = daily_revenue.len(),
            "aggregate collections rebuilt"
        );

        PipelineRun { run_id, events, products, customers, daily_revenue, exclusions }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::config::{DateWindow, ScoringConfig, TrendConfig};
    use crate::domain::event::RawEvent;
    use crate::domain::product::TrendStatus;

    use super::AnalyticsPipeline;

    fn pipeline() -> AnalyticsPipeline {
        AnalyticsPipeline::new(
            DateWindow {
                start: NaiveDate::from_ymd_opt(2021, 1, 1).expect("start"),
                end: NaiveDate::from_ymd_opt(2021, 1, 31).expect("end"),
            },
            5,
            TrendConfig::default(),
            ScoringConfig::default(),
        )
    }

    fn row(sku: &str, event_name: &str, day: u32, revenue: Option<i64>) -> RawEvent {
        RawEvent {
            product_sku: Some(sku.to_string()),
            product_name: Some(format!("{sku} name")),
            category: Some("Audio".to_string()),
            brand: Some("AudioPro".to_string()),
            price: Some(Decimal::new(4999, 2)),
            event_date: Some(format!("202101{day:02}")),
            user_id: None,
            event_name: Some(event_name.to_string()),
            revenue: revenue.map(|value| Decimal::new(value, 0)),
            country: None,
            device_category: None,
        }
    }

    fn scenario_a_rows() -> Vec<RawEvent> {
        let mut rows: Vec<RawEvent> = (0..10).map(|_| row("A", "view_item", 1, None)).collect();
        rows.push(row("A", "purchase", 1, Some(20)));
        rows.push(row("A", "purchase", 10, Some(80)));
        rows
    }

    #[test]
    fn growing_product_with_conversion_and_revenue() {
        let run = pipeline().run(scenario_a_rows());

        assert_eq!(run.products.len(), 1);
        let product = &run.products[0];
        assert_eq!(product.views, 10);
        assert_eq!(product.purchases, 2);
        assert_eq!(product.view_to_purchase_rate, Some(0.2));
        assert_eq!(product.total_revenue, Decimal::new(100, 0));
        assert!(product.trend_correlation.expect("correlation defined") > 0.1);
        assert_eq!(product.trend_status, TrendStatus::Growing);
        // 0.2 * 40 + (10 / 10) * 30 + 0 + 10
        assert_eq!(product.performance_score, 48.0);
    }

    #[test]
    fn view_only_product_meets_floor_with_null_purchase_ratios() {
        let rows: Vec<RawEvent> = (0..6).map(|_| row("B", "view_item", 2, None)).collect();
        let run = pipeline().run(rows);

        assert_eq!(run.products.len(), 1);
        let product = &run.products[0];
        assert_eq!(product.total_revenue, Decimal::ZERO);
        assert_eq!(product.cart_to_purchase_rate, None);
        assert_eq!(product.revenue_per_purchase, None);
        assert_eq!(product.trend_correlation, None);
        assert_eq!(product.trend_status, TrendStatus::Stable);
    }

    #[test]
    fn below_floor_products_are_absent_not_zero_filled() {
        let rows: Vec<RawEvent> = (0..4).map(|_| row("TINY", "view_item", 1, None)).collect();
        let run = pipeline().run(rows);
        assert!(run.products.is_empty());
    }

    #[test]
    fn single_purchase_date_yields_stable_trend() {
        let mut rows: Vec<RawEvent> = (0..4).map(|_| row("C", "view_item", 3, None)).collect();
        rows.push(row("C", "purchase", 3, Some(50)));
        let run = pipeline().run(rows);

        let product = &run.products[0];
        assert_eq!(product.trend_correlation, None);
        assert_eq!(product.trend_status, TrendStatus::Stable);
    }

    #[test]
    fn runs_are_deterministic_for_identical_input() {
        let p = pipeline();
        let mut rows = scenario_a_rows();
        rows.extend((0..6).map(|_| row("B", "view_item", 2, None)));
        rows.push(row("", "view_item", 1, None));

        let first = p.run(rows.clone());
        let second = p.run(rows);

        assert_eq!(first.products, second.products);
        assert_eq!(first.customers, second.customers);
        assert_eq!(first.daily_revenue, second.daily_revenue);
        assert_eq!(first.exclusions, second.exclusions);

        let first_json = serde_json::to_string(&first.products).expect("serialize");
        let second_json = serde_json::to_string(&second.products).expect("serialize");
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn empty_input_produces_empty_collections() {
        let run = pipeline().run(Vec::new());
        assert!(run.products.is_empty());
        assert!(run.customers.is_empty());
        assert!(run.daily_revenue.is_empty());
        assert_eq!(run.exclusions.total(), 0);
    }
}
