use vistagraph_core::model::snapshot::{GlobalIdentity, IdentitySnapshot};

use crate::error::IngestError;
use crate::types::RecordBatch;

/// Destination for entity and edge batches. Implementations own batching
/// mechanics beyond what the pipeline provides: retries, transactions,
/// query dialect.
pub trait GraphSink {
    /// Commit one batch; returns the number of records accepted.
    fn commit(&mut self, batch: RecordBatch) -> Result<usize, IngestError>;
}

/// Source of previously materialized identities, used to seed the
/// resolution cache at the start of a phase.
pub trait SnapshotSource {
    fn load_identities(&self) -> Result<IdentitySnapshot, IngestError>;

    /// Globals are created mid-phase; their index is refreshed separately.
    fn load_globals(&self) -> Result<Vec<GlobalIdentity>, IngestError>;
}
