pub mod aggregate;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod score;
pub mod snapshot;
pub mod trend;
