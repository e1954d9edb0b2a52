// Retrieval module
// Embeds a question and returns the most similar chunk texts


use tracing::{debug, warn};

use crate::database::{CollectionHandle, VectorIndex};
use crate::embeddings::{EmbedMode, EmbeddingClient};
use crate::indexer::check_dimension;

pub struct Retriever<'a> {
    embedder: &'a dyn EmbeddingClient,
    index: &'a dyn VectorIndex,
}

impl<'a> Retriever<'a> {
    #[inline]
    pub fn new(embedder: &'a dyn EmbeddingClient, index: &'a dyn VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// The payload texts of the `top_k` records nearest to `question`.
    ///
    /// Order is exactly what the index reported, most similar first. An empty
    /// collection gives an empty result.
    #[inline]
    pub fn retrieve(
        &self,
        question: &str,
        collection: &CollectionHandle,
        top_k: usize,
    ) -> crate::Result<Vec<String>> {
        let embeddings = self
            .embedder
            .embed(&[question.to_string()], EmbedMode::Query)?;
        let Some(vector) = embeddings.into_iter().next() else {
            return Err(crate::FinWhizError::Other(anyhow::anyhow!(
                "Embedding client returned no vector for the question"
            )));
        };
        check_dimension(collection.dimension, &vector)?;

        let matches = self.index.query(collection, &vector, top_k, true)?;
        debug!(
            "Query against {} returned {} matches",
            collection.name,
            matches.len()
        );

        let snippets = matches
            .into_iter()
            .filter_map(|found| match found.payload {
                Some(payload) => Some(payload.text),
                None => {
                    warn!("Match {} has no payload, skipping", found.id);
                    None
                }
            })
            .take(top_k)
            .collect();

        Ok(snippets)
    }
}
