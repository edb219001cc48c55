//! Snapshot source backed by plain JSON files exported by the consumer.

use std::path::{Path, PathBuf};

use vistagraph_core::model::snapshot::{GlobalIdentity, IdentitySnapshot};
use vistagraph_ingest::{IngestError, SnapshotSource};

pub struct JsonSnapshotSource {
    identities_path: PathBuf,
    globals_path: Option<PathBuf>,
}

impl JsonSnapshotSource {
    pub fn new(identities_path: &Path, globals_path: Option<&Path>) -> Self {
        Self {
            identities_path: identities_path.to_path_buf(),
            globals_path: globals_path.map(Path::to_path_buf),
        }
    }
}

impl SnapshotSource for JsonSnapshotSource {
    fn load_identities(&self) -> Result<IdentitySnapshot, IngestError> {
        let text = std::fs::read_to_string(&self.identities_path)?;
        serde_json::from_str(&text)
            .map_err(|err| IngestError::Sink(format!("decoding identity snapshot: {err}")))
    }

    /// Without a globals file the index simply stays empty; accesses then
    /// come back unresolved rather than failing the phase.
    fn load_globals(&self) -> Result<Vec<GlobalIdentity>, IngestError> {
        let Some(path) = &self.globals_path else {
            return Ok(Vec::new());
        };
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|err| IngestError::Sink(format!("decoding globals snapshot: {err}")))
    }
}
