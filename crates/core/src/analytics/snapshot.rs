//! Published analytics state.
//!
//! A run builds a complete new snapshot off to the side and swaps it in as
//! one pointer write. Readers hold an `Arc` to whichever snapshot was
//! current when they asked and never observe a half-built collection.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::analytics::normalize::ExclusionStats;
use crate::domain::customer::CustomerAggregate;
use crate::domain::product::ProductAggregate;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub products: Vec<ProductAggregate>,
    pub customers: Vec<CustomerAggregate>,
    pub exclusions: ExclusionStats,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<AnalyticsSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot that was current at call time.
    pub fn current(&self) -> Arc<AnalyticsSnapshot> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Makes `snapshot` the current one. The previous snapshot stays alive
    /// until its last reader drops it.
    pub fn publish(&self, snapshot: AnalyticsSnapshot) {
        let next = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }
}
