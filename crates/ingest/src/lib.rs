//! The persistence boundary and phase-ordered pipeline driver.
//!
//! The extraction core emits plain data; everything that touches a store
//! lives behind [`GraphSink`] and [`SnapshotSource`]. Batch sizing, retry
//! and query dialect are the consumer's business.

pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use error::IngestError;
pub use pipeline::{Pipeline, PipelineConfig, PhaseSummary};
pub use traits::{GraphSink, SnapshotSource};
pub use types::{chunks, EntityRecord, EdgeRecord, Phase, RecordBatch, Resolution};
