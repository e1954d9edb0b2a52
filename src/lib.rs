use thiserror::Error;

pub type Result<T> = std::result::Result<T, FinWhizError>;

#[derive(Error, Debug)]
pub enum FinWhizError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] document::ExtractionError),

    #[error("Remote service error: {0}")]
    RemoteService(#[from] remote::RemoteServiceError),

    #[error("Embedding dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No document has been indexed in this session")]
    NoDocument,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod assistant;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod generation;
pub mod indexer;
pub mod remote;
pub mod retrieval;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
