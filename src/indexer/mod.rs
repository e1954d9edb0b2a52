// Indexer module
// Turns an uploaded document into embedded, upserted chunk records


use tracing::{debug, info};
use uuid::Uuid;

use crate::FinWhizError;
use crate::config::{IndexConfig, NamespacePolicy};
use crate::database::{CollectionHandle, CollectionSpec, Payload, Record, VectorIndex};
use crate::document::Document;
use crate::embeddings::{ChunkingConfig, EmbedMode, EmbeddingClient, chunk_document};

/// Runs the indexing pipeline against borrowed remote capabilities
pub struct Indexer<'a> {
    embedder: &'a dyn EmbeddingClient,
    index: &'a dyn VectorIndex,
    index_config: &'a IndexConfig,
    chunking: &'a ChunkingConfig,
}

impl<'a> Indexer<'a> {
    #[inline]
    pub fn new(
        embedder: &'a dyn EmbeddingClient,
        index: &'a dyn VectorIndex,
        index_config: &'a IndexConfig,
        chunking: &'a ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            index_config,
            chunking,
        }
    }

    /// Index `document` into `collection_name` and return a handle for retrieval.
    ///
    /// The collection is created if absent. All chunks are embedded in one
    /// embedding call and written in one upsert call; an error from either
    /// propagates and nothing later in the pipeline runs.
    #[inline]
    pub fn index_document(
        &self,
        document: &Document,
        collection_name: &str,
    ) -> crate::Result<CollectionHandle> {
        info!("Indexing {} into {}", document.name, collection_name);

        self.ensure_collection(collection_name)?;

        let text = document.extract_text()?;
        let chunks = chunk_document(&text, self.chunking);
        let handle = CollectionHandle {
            name: collection_name.to_string(),
            namespace: self.namespace_for_upload(document),
            dimension: self.index_config.dimension,
        };

        if chunks.is_empty() {
            info!("{} has no text, nothing to upsert", document.name);
            return Ok(handle);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts, EmbedMode::Document)?;

        if embeddings.len() != chunks.len() {
            return Err(FinWhizError::Other(anyhow::anyhow!(
                "Embedding client returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(embeddings) {
            check_dimension(self.index_config.dimension, &vector)?;
            records.push(Record {
                id: chunk.id(),
                vector,
                payload: Payload { text: chunk.text },
            });
        }

        let written = self.index.upsert(&handle, &records)?;
        debug!("Upserted {} of {} records", written, records.len());

        info!(
            "Indexed {} chunks of {} into {}{}",
            records.len(),
            document.name,
            handle.name,
            handle
                .namespace
                .as_deref()
                .map(|ns| format!(" (namespace {})", ns))
                .unwrap_or_default()
        );

        Ok(handle)
    }

    /// Create the collection unless it is already listed
    fn ensure_collection(&self, collection_name: &str) -> crate::Result<()> {
        let existing = self.index.list_collections()?;
        if existing.contains(collection_name) {
            debug!("Collection {} already exists", collection_name);
            return Ok(());
        }

        info!(
            "Creating collection {} ({} dimensions, {})",
            collection_name, self.index_config.dimension, self.index_config.metric
        );
        self.index.create_collection(&CollectionSpec {
            name: collection_name.to_string(),
            dimension: self.index_config.dimension,
            metric: self.index_config.metric,
            cloud: self.index_config.cloud.clone(),
            region: self.index_config.region.clone(),
        })?;
        Ok(())
    }

    /// Per-document namespaces are named after the document bytes, so
    /// re-indexing the same file overwrites its own records
    fn namespace_for_upload(&self, document: &Document) -> Option<String> {
        match self.index_config.namespace_policy {
            NamespacePolicy::PerDocument => Some(format!(
                "doc-{}",
                Uuid::new_v5(&Uuid::NAMESPACE_OID, &document.bytes)
            )),
            NamespacePolicy::Shared => None,
        }
    }
}

/// Reject vectors whose length differs from the collection's
#[inline]
pub fn check_dimension(expected: usize, vector: &[f32]) -> crate::Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(FinWhizError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
