use thiserror::Error;

#[derive(Error, Debug)]
pub enum VistagraphError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, VistagraphError>;
