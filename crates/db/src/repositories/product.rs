use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;

use retailsense_core::domain::event::ProductSku;
use retailsense_core::domain::product::{ProductAggregate, TrendStatus};

use super::{ProductPerformanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductPerformanceRepository {
    pool: DbPool,
}

impl SqlProductPerformanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    value
        .parse::<NaiveDate>()
        .map_err(|error| RepositoryError::Decode(format!("invalid stored date `{value}`: {error}")))
}

fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid stored decimal `{value}`: {error}"))
    })
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<ProductAggregate, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let total_revenue: String = row.try_get("total_revenue").map_err(decode)?;
    let first_activity_date: String = row.try_get("first_activity_date").map_err(decode)?;
    let last_activity_date: String = row.try_get("last_activity_date").map_err(decode)?;
    let trend_status: String = row.try_get("trend_status").map_err(decode)?;

    Ok(ProductAggregate {
        product_sku: ProductSku(row.try_get("product_sku").map_err(decode)?),
        product_name: row.try_get("product_name").map_err(decode)?,
        category: row.try_get("category").map_err(decode)?,
        brand: row.try_get("brand").map_err(decode)?,
        views: row.try_get::<i64, _>("views").map_err(decode)? as u64,
        cart_adds: row.try_get::<i64, _>("cart_adds").map_err(decode)? as u64,
        checkouts: row.try_get::<i64, _>("checkouts").map_err(decode)? as u64,
        purchases: row.try_get::<i64, _>("purchases").map_err(decode)? as u64,
        total_revenue: parse_decimal(&total_revenue)?,
        unique_users: row.try_get::<i64, _>("unique_users").map_err(decode)? as u64,
        countries: row.try_get::<i64, _>("countries").map_err(decode)? as u64,
        device_types: row.try_get::<i64, _>("device_types").map_err(decode)? as u64,
        view_to_purchase_rate: row.try_get("view_to_purchase_rate").map_err(decode)?,
        view_to_cart_rate: row.try_get("view_to_cart_rate").map_err(decode)?,
        cart_to_purchase_rate: row.try_get("cart_to_purchase_rate").map_err(decode)?,
        revenue_per_purchase: row.try_get("revenue_per_purchase").map_err(decode)?,
        revenue_per_view: row.try_get("revenue_per_view").map_err(decode)?,
        first_activity_date: parse_date(&first_activity_date)?,
        last_activity_date: parse_date(&last_activity_date)?,
        trend_correlation: row.try_get("trend_correlation").map_err(decode)?,
        trend_status: TrendStatus::parse(&trend_status).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown trend status `{trend_status}`"))
        })?,
        performance_score: row.try_get("performance_score").map_err(decode)?,
    })
}

#[async_trait::async_trait]
impl ProductPerformanceRepository for SqlProductPerformanceRepository {
    async fn replace_all(&self, products: &[ProductAggregate]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM product_performance").execute(&mut *tx).await?;

        for (rank, product) in products.iter().enumerate() {
            sqlx::query(
                "INSERT INTO product_performance (
                    product_sku, product_name, category, brand,
                    views, cart_adds, checkouts, purchases,
                    total_revenue, unique_users, countries, device_types,
                    view_to_purchase_rate, view_to_cart_rate, cart_to_purchase_rate,
                    revenue_per_purchase, revenue_per_view,
                    first_activity_date, last_activity_date,
                    trend_correlation, trend_status, performance_score, rank
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&product.product_sku.0)
            .bind(&product.product_name)
            .bind(&product.category)
            .bind(&product.brand)
            .bind(product.views as i64)
            .bind(product.cart_adds as i64)
            .bind(product.checkouts as i64)
            .bind(product.purchases as i64)
            .bind(product.total_revenue.to_string())
            .bind(product.unique_users as i64)
            .bind(product.countries as i64)
            .bind(product.device_types as i64)
            .bind(product.view_to_purchase_rate)
            .bind(product.view_to_cart_rate)
            .bind(product.cart_to_purchase_rate)
            .bind(product.revenue_per_purchase)
            .bind(product.revenue_per_view)
            .bind(product.first_activity_date.to_string())
            .bind(product.last_activity_date.to_string())
            .bind(product.trend_correlation)
            .bind(product.trend_status.as_str())
            .bind(product.performance_score)
            .bind(rank as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<ProductAggregate>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM product_performance ORDER BY rank")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_product).collect()
    }
}
