pub mod analytics;
pub mod config;
pub mod domain;
pub mod errors;

pub use analytics::aggregate::{aggregate_customers, aggregate_products, daily_revenue};
pub use analytics::normalize::{normalize, ExclusionStats};
pub use analytics::pipeline::{AnalyticsPipeline, PipelineRun};
pub use analytics::report::{CategoryRollup, InsightsReport};
pub use analytics::score::performance_score;
pub use analytics::snapshot::{AnalyticsSnapshot, SnapshotStore};
pub use analytics::trend::{analyze_trend, TrendSummary};
pub use domain::customer::CustomerAggregate;
pub use domain::event::{Event, EventKind, ProductSku, RawEvent};
pub use domain::product::{ProductAggregate, TrendStatus};
pub use errors::{ApplicationError, DomainError};
