use async_trait::async_trait;
use thiserror::Error;

use retailsense_core::domain::customer::CustomerAggregate;
use retailsense_core::domain::product::ProductAggregate;

pub mod customer;
pub mod product;

pub use customer::SqlCustomerProfileRepository;
pub use product::SqlProductPerformanceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persisted product aggregates. `replace_all` swaps the entire table in
/// one transaction: concurrent readers see the previous run or the new one,
/// never a partial rebuild.
#[async_trait]
pub trait ProductPerformanceRepository: Send + Sync {
    async fn replace_all(&self, products: &[ProductAggregate]) -> Result<(), RepositoryError>;
    async fn fetch_all(&self) -> Result<Vec<ProductAggregate>, RepositoryError>;
}

#[async_trait]
pub trait CustomerProfileRepository: Send + Sync {
    async fn replace_all(&self, customers: &[CustomerAggregate]) -> Result<(), RepositoryError>;
    async fn fetch_all(&self) -> Result<Vec<CustomerAggregate>, RepositoryError>;
}
