use rust_decimal::Decimal;
use sqlx::Row;

use retailsense_core::domain::customer::CustomerAggregate;

use super::{CustomerProfileRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerProfileRepository {
    pool: DbPool,
}

impl SqlCustomerProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerAggregate, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());

    let total_revenue: String = row.try_get("total_revenue").map_err(decode)?;
    let total_revenue = total_revenue.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid stored decimal `{total_revenue}`: {error}"))
    })?;

    Ok(CustomerAggregate {
        user_id: row.try_get("user_id").map_err(decode)?,
        total_purchases: row.try_get::<i64, _>("total_purchases").map_err(decode)? as u64,
        total_revenue,
        avg_order_value: row.try_get("avg_order_value").map_err(decode)?,
        days_active: row.try_get("days_active").map_err(decode)?,
        unique_categories: row.try_get::<i64, _>("unique_categories").map_err(decode)? as u64,
        device_diversity: row.try_get::<i64, _>("device_diversity").map_err(decode)? as u64,
        geographic_reach: row.try_get::<i64, _>("geographic_reach").map_err(decode)? as u64,
    })
}

#[async_trait::async_trait]
impl CustomerProfileRepository for SqlCustomerProfileRepository {
    async fn replace_all(&self, customers: &[CustomerAggregate]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_profile").execute(&mut *tx).await?;

        for (rank, customer) in customers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO customer_profile (
                    user_id, total_purchases, total_revenue, avg_order_value,
                    days_active, unique_categories, device_diversity, geographic_reach, rank
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&customer.user_id)
            .bind(customer.total_purchases as i64)
            .bind(customer.total_revenue.to_string())
            .bind(customer.avg_order_value)
            .bind(customer.days_active)
            .bind(customer.unique_categories as i64)
            .bind(customer.device_diversity as i64)
            .bind(customer.geographic_reach as i64)
            .bind(rank as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<CustomerAggregate>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM customer_profile ORDER BY rank")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_customer).collect()
    }
}
