//! JSON-lines sink: one JSON object per committed batch.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use vistagraph_ingest::{GraphSink, IngestError, RecordBatch};

pub struct JsonlSink {
    writer: BufWriter<File>,
    batches: usize,
}

impl JsonlSink {
    /// Append to `path`, creating it if needed. Phases run as separate
    /// invocations against the same output file.
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            batches: 0,
        })
    }

    pub fn batches_written(&self) -> usize {
        self.batches
    }
}

impl GraphSink for JsonlSink {
    fn commit(&mut self, batch: RecordBatch) -> Result<usize, IngestError> {
        let accepted = batch.len();
        let line = serde_json::to_string(&batch)
            .map_err(|err| IngestError::Sink(format!("serializing batch: {err}")))?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.batches += 1;
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vistagraph_ingest::Phase;

    #[test]
    fn commits_append_one_line_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut sink = JsonlSink::open(&path).unwrap();
        for seq in 0..2 {
            let batch = RecordBatch {
                batch_id: format!("foundation-{seq:04}"),
                phase: Phase::Foundation,
                entities: Vec::new(),
                edges: Vec::new(),
            };
            assert_eq!(sink.commit(batch).unwrap(), 0);
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        let first: RecordBatch = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first.batch_id, "foundation-0000");
    }
}
