//! Error types for index building, decoding and querying

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Corrupt or truncated index data. Never produced for a plain miss.
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Background writer has shut down")]
    WriterClosed,

    /// Index files the background writer could not write; each was logged.
    #[error("{failed} index files failed to write ({written} written)")]
    WriteFailed { failed: usize, written: usize },
}

impl IndexError {
    /// Stable error code, used by the CLI exit report.
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Io(_) => "IO_ERROR",
            IndexError::Json(_) => "JSON_ERROR",
            IndexError::InvalidFormat(_) => "INVALID_FORMAT",
            IndexError::InvalidArgument(_) => "INVALID_ARGUMENT",
            IndexError::Query(_) => "QUERY_ERROR",
            IndexError::NotImplemented(_) => "NOT_IMPLEMENTED",
            IndexError::Config(_) => "CONFIG_ERROR",
            IndexError::WriterClosed => "WRITER_CLOSED",
            IndexError::WriteFailed { .. } => "WRITE_FAILED",
        }
    }

    /// True for errors caused by damaged index bytes.
    pub fn is_malformed(&self) -> bool {
        matches!(self, IndexError::InvalidFormat(_))
    }
}
