//! Prediction Adapter - external model collaborators and merge logic
//!
//! This crate is the boundary between the deterministic analytics core and
//! the external prediction services (revenue forecasting, customer
//! segmentation, early-window product classification). It:
//! - Extracts feature vectors from finished aggregates (`features`)
//! - Defines one narrow trait per collaborator contract (`collaborators`)
//! - Ships an HTTP client and a deterministic in-process stub per trait
//!   (`http`, `stub`)
//! - Dispatches batches with bounded concurrency and per-request timeouts
//!   (`runtime`)
//! - Left-joins returned predictions back onto the aggregates (`merge`)
//!
//! # Boundary Principle
//!
//! Collaborators only ANNOTATE. Every aggregate, ratio, trend, and score is
//! computed deterministically by the core before this crate runs, and every
//! aggregate survives a collaborator failure with its prediction fields
//! null. A dead model service can never cost a product its row.

pub mod collaborators;
pub mod features;
pub mod http;
pub mod merge;
pub mod runtime;
pub mod stub;

pub use collaborators::{
    Classifier, ClassificationOutcome, CollaboratorError, CustomerFeatures, DailyRevenuePoint,
    EarlyWindowFeatures, ForecastPoint, ForecastRequest, Forecaster, SegmentAssignment, Segmenter,
};
pub use merge::{ClassifiedProduct, SegmentedCustomer};
pub use runtime::{PredictionOutcome, PredictionRuntime, PredictionWarnings};
