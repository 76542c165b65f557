//! Left-join merge of collaborator responses onto the aggregate
//! collections. Every aggregate is retained whether or not a prediction
//! came back for it; a missing key leaves the prediction fields null.

use std::collections::HashMap;

use serde::Serialize;

use retailsense_core::domain::customer::CustomerAggregate;
use retailsense_core::domain::product::ProductAggregate;

use crate::collaborators::{ClassificationOutcome, SegmentAssignment};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedProduct {
    #[serde(flatten)]
    pub aggregate: ProductAggregate,
    pub predicted_label: Option<String>,
    pub predicted_probability: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentedCustomer {
    #[serde(flatten)]
    pub aggregate: CustomerAggregate,
    pub cluster_id: Option<u32>,
}

pub fn merge_classifications(
    products: Vec<ProductAggregate>,
    outcomes: &[ClassificationOutcome],
) -> Vec<ClassifiedProduct> {
    let by_sku: HashMap<&str, &ClassificationOutcome> =
        outcomes.iter().map(|outcome| (outcome.product_sku.as_str(), outcome)).collect();

    products
        .into_iter()
        .map(|aggregate| {
            let outcome = by_sku.get(aggregate.product_sku.0.as_str());
            ClassifiedProduct {
                predicted_label: outcome.map(|o| o.label.clone()),
                predicted_probability: outcome.map(|o| o.probability),
                aggregate,
            }
        })
        .collect()
}

pub fn merge_segments(
    customers: Vec<CustomerAggregate>,
    assignments: &[SegmentAssignment],
) -> Vec<SegmentedCustomer> {
    let by_user: HashMap<&str, u32> = assignments
        .iter()
        .map(|assignment| (assignment.user_id.as_str(), assignment.cluster_id))
        .collect();

    customers
        .into_iter()
        .map(|aggregate| SegmentedCustomer {
            cluster_id: by_user.get(aggregate.user_id.as_str()).copied(),
            aggregate,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use retailsense_core::domain::customer::CustomerAggregate;
    use retailsense_core::domain::event::ProductSku;
    use retailsense_core::domain::product::{ProductAggregate, TrendStatus};

    use crate::collaborators::{ClassificationOutcome, SegmentAssignment};

    use super::{merge_classifications, merge_segments};

    fn product(sku: &str) -> ProductAggregate {
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).expect("day");
        ProductAggregate {
            product_sku: ProductSku(sku.to_string()),
            product_name: None,
            category: None,
            brand: None,
            views: 10,
            cart_adds: 2,
            checkouts: 1,
            purchases: 1,
            total_revenue: Decimal::new(50, 0),
            unique_users: 3,
            countries: 1,
            device_types: 1,
            view_to_purchase_rate: Some(0.1),
            view_to_cart_rate: Some(0.2),
            cart_to_purchase_rate: Some(0.5),
            revenue_per_purchase: Some(50.0),
            revenue_per_view: Some(5.0),
            first_activity_date: day,
            last_activity_date: day,
            trend_correlation: None,
            trend_status: TrendStatus::Stable,
            performance_score: 25.0,
        }
    }

    fn customer(user_id: &str) -> CustomerAggregate {
        CustomerAggregate {
            user_id: user_id.to_string(),
            total_purchases: 2,
            total_revenue: Decimal::new(80, 0),
            avg_order_value: Some(40.0),
            days_active: 5,
            unique_categories: 1,
            device_diversity: 1,
            geographic_reach: 1,
        }
    }

    #[test]
    fn unmatched_products_keep_null_predictions() {
        let outcomes = vec![ClassificationOutcome {
            product_sku: "A".to_string(),
            label: "high_potential".to_string(),
            probability: 0.9,
        }];

        let merged = merge_classifications(vec![product("A"), product("C")], &outcomes);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].predicted_label.as_deref(), Some("high_potential"));
        assert_eq!(merged[1].predicted_label, None);
        assert_eq!(merged[1].predicted_probability, None);
        assert_eq!(merged[1].aggregate.product_sku.0, "C");
    }

    #[test]
    fn stale_prediction_keys_are_ignored() {
        let outcomes = vec![ClassificationOutcome {
            product_sku: "GONE".to_string(),
            label: "standard".to_string(),
            probability: 0.5,
        }];

        let merged = merge_classifications(vec![product("A")], &outcomes);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].predicted_label, None);
    }

    #[test]
    fn customers_join_by_user_id() {
        let assignments = vec![
            SegmentAssignment { user_id: "kept".to_string(), cluster_id: 2 },
        ];

        let merged = merge_segments(vec![customer("kept"), customer("missed")], &assignments);
        assert_eq!(merged[0].cluster_id, Some(2));
        assert_eq!(merged[1].cluster_id, None);
    }
}
