use chrono::NaiveDate;
use rust_decimal::Decimal;

use retailsense_core::domain::customer::CustomerAggregate;
use retailsense_core::domain::event::ProductSku;
use retailsense_core::domain::product::{ProductAggregate, TrendStatus};
use retailsense_db::{
    connect_with_settings, migrations, CustomerProfileRepository, ProductPerformanceRepository,
    SqlCustomerProfileRepository, SqlProductPerformanceRepository,
};

fn product(sku: &str, revenue: i64, score: f64) -> ProductAggregate {
    ProductAggregate {
        product_sku: ProductSku(sku.to_string()),
        product_name: Some(format!("{sku} name")),
        category: Some("Audio".to_string()),
        brand: None,
        views: 120,
        cart_adds: 30,
        checkouts: 12,
        purchases: 6,
        total_revenue: Decimal::new(revenue, 2),
        unique_users: 48,
        countries: 3,
        device_types: 2,
        view_to_purchase_rate: Some(0.05),
        view_to_cart_rate: Some(0.25),
        cart_to_purchase_rate: Some(0.2),
        revenue_per_purchase: Some(25.5),
        revenue_per_view: None,
        first_activity_date: NaiveDate::from_ymd_opt(2021, 1, 2).expect("date"),
        last_activity_date: NaiveDate::from_ymd_opt(2021, 3, 28).expect("date"),
        trend_correlation: Some(0.42),
        trend_status: TrendStatus::Growing,
        performance_score: score,
    }
}

fn customer(user_id: &str, revenue: i64) -> CustomerAggregate {
    CustomerAggregate {
        user_id: user_id.to_string(),
        total_purchases: 4,
        total_revenue: Decimal::new(revenue, 2),
        avg_order_value: Some(revenue as f64 / 400.0),
        days_active: 61,
        unique_categories: 3,
        device_diversity: 2,
        geographic_reach: 1,
    }
}

async fn pool() -> retailsense_db::DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    pool
}

#[tokio::test]
async fn product_rows_round_trip_in_canonical_order() {
    let pool = pool().await;
    let repository = SqlProductPerformanceRepository::new(pool);

    let products = vec![product("TOP", 90_000, 72.5), product("MID", 45_000, 31.25)];
    repository.replace_all(&products).await.expect("replace");

    let stored = repository.fetch_all().await.expect("fetch");
    assert_eq!(stored, products);
}

#[tokio::test]
async fn replace_discards_the_previous_run_entirely() {
    let pool = pool().await;
    let repository = SqlProductPerformanceRepository::new(pool);

    repository
        .replace_all(&[product("OLD-A", 100, 1.0), product("OLD-B", 50, 0.5)])
        .await
        .expect("first run");
    repository.replace_all(&[product("NEW", 999, 9.9)]).await.expect("second run");

    let stored = repository.fetch_all().await.expect("fetch");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].product_sku.0, "NEW");
}

#[tokio::test]
async fn replace_with_empty_set_clears_the_table() {
    let pool = pool().await;
    let repository = SqlProductPerformanceRepository::new(pool);

    repository.replace_all(&[product("ONLY", 10, 0.1)]).await.expect("seed");
    repository.replace_all(&[]).await.expect("clear");

    assert!(repository.fetch_all().await.expect("fetch").is_empty());
}

#[tokio::test]
async fn customer_rows_round_trip() {
    let pool = pool().await;
    let repository = SqlCustomerProfileRepository::new(pool);

    let customers = vec![customer("whale", 420_000), customer("regular", 8_000)];
    repository.replace_all(&customers).await.expect("replace");

    let stored = repository.fetch_all().await.expect("fetch");
    assert_eq!(stored, customers);
}

#[tokio::test]
async fn null_ratio_columns_survive_the_round_trip() {
    let pool = pool().await;
    let repository = SqlProductPerformanceRepository::new(pool);

    let mut no_purchases = product("B", 0, 0.0);
    no_purchases.view_to_purchase_rate = Some(0.0);
    no_purchases.cart_to_purchase_rate = None;
    no_purchases.revenue_per_purchase = None;
    no_purchases.trend_correlation = None;
    no_purchases.trend_status = TrendStatus::Stable;

    repository.replace_all(std::slice::from_ref(&no_purchases)).await.expect("replace");

    let stored = repository.fetch_all().await.expect("fetch");
    assert_eq!(stored[0].cart_to_purchase_rate, None);
    assert_eq!(stored[0].trend_correlation, None);
    assert_eq!(stored[0].trend_status, TrendStatus::Stable);
}
