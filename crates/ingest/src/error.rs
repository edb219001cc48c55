use thiserror::Error;

use vistagraph_core::error::VistagraphError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] VistagraphError),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
}
