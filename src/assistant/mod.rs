// Assistant module
// Composes indexing, retrieval and answer generation over one configuration


use tracing::info;

use crate::config::Config;
use crate::database::{CollectionHandle, VectorIndex};
use crate::document::Document;
use crate::embeddings::EmbeddingClient;
use crate::generation::{AnswerGenerator, ChatCompletion};
use crate::indexer::Indexer;
use crate::retrieval::Retriever;

/// Question answering over uploaded documents
pub struct Assistant<'a> {
    embedder: &'a dyn EmbeddingClient,
    index: &'a dyn VectorIndex,
    chat: &'a dyn ChatCompletion,
    config: &'a Config,
}

impl<'a> Assistant<'a> {
    #[inline]
    pub fn new(
        embedder: &'a dyn EmbeddingClient,
        index: &'a dyn VectorIndex,
        chat: &'a dyn ChatCompletion,
        config: &'a Config,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        self.config
    }

    /// Index `document` into the configured collection
    #[inline]
    pub fn index_document(&self, document: &Document) -> crate::Result<CollectionHandle> {
        self.index_document_into(document, &self.config.index.collection_name)
    }

    #[inline]
    pub fn index_document_into(
        &self,
        document: &Document,
        collection_name: &str,
    ) -> crate::Result<CollectionHandle> {
        Indexer::new(
            self.embedder,
            self.index,
            &self.config.index,
            &self.config.chunking,
        )
        .index_document(document, collection_name)
    }

    /// Retrieve supporting snippets for `question` and generate a grounded answer
    #[inline]
    pub fn answer(&self, question: &str, collection: &CollectionHandle) -> crate::Result<String> {
        let snippets = Retriever::new(self.embedder, self.index).retrieve(
            question,
            collection,
            self.config.index.top_k,
        )?;
        info!("Retrieved {} snippets for question", snippets.len());

        let answer = AnswerGenerator::new(self.chat, self.config.cohere.chat_model.as_str())
            .generate(question, &snippets)?;
        Ok(answer)
    }
}
