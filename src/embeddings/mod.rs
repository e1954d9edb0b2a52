// Embeddings module
// Text chunking and the embedding capability used to vectorize chunks and questions

pub mod chunking;
pub mod cohere;

use std::fmt;

use crate::remote::RemoteServiceError;

pub use chunking::{Chunk, ChunkingConfig, chunk, chunk_document, chunk_id};
pub use cohere::CohereEmbedder;

/// What the embedded text will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// A question used to search the collection
    Query,
    /// A chunk being stored in the collection
    Document,
}

impl EmbedMode {
    /// Cohere `input_type` value for this mode
    #[inline]
    pub fn input_type(self) -> &'static str {
        match self {
            Self::Query => "search_query",
            Self::Document => "search_document",
        }
    }
}

impl fmt::Display for EmbedMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Document => f.write_str("document"),
        }
    }
}

/// A service that turns text into fixed-length vectors
pub trait EmbeddingClient {
    /// Embed every text in `texts`, returning one vector per input in the same order
    fn embed(&self, texts: &[String], mode: EmbedMode)
    -> Result<Vec<Vec<f32>>, RemoteServiceError>;
}
