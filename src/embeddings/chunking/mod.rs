#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// One positional slice of a document's extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position of this chunk within the document
    pub index: usize,
    /// The chunk text
    pub text: String,
}

impl Chunk {
    /// Record identity for this chunk, e.g. `chunk-0`
    #[inline]
    pub fn id(&self) -> String {
        chunk_id(self.index)
    }
}

/// Configuration for content chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[inline]
pub fn chunk_id(index: usize) -> String {
    format!("chunk-{}", index)
}

/// Split `text` into consecutive, non-overlapping pieces of `size` characters.
///
/// Boundaries are purely positional: words and sentences may be cut. The last
/// piece holds the remainder. Empty input yields no pieces, and a `size` of
/// zero is treated as one.
#[inline]
pub fn chunk(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    text.chars()
        .chunks(size)
        .into_iter()
        .map(|piece| piece.collect::<String>())
        .collect()
}

/// Chunk `text` and attach positional identities
#[inline]
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = chunk(text, config.chunk_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect();

    debug!(
        "Chunked {} characters into {} chunks of at most {}",
        text.chars().count(),
        chunks.len(),
        config.chunk_size
    );

    chunks
}
