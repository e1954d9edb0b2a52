// Deterministic stand-ins for the remote capabilities

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::database::{
    CollectionHandle, CollectionSpec, InMemoryIndex, Match, Record, VectorIndex,
};
use crate::embeddings::{EmbedMode, EmbeddingClient};
use crate::generation::ChatCompletion;
use crate::remote::{RemoteFailure, RemoteServiceError, Service};

pub(crate) fn transport_error(service: Service) -> RemoteServiceError {
    RemoteServiceError::new(service, RemoteFailure::Transport, "connection reset")
}

/// Character-histogram embeddings: identical text gives identical vectors
pub(crate) struct FakeEmbedder {
    pub dimension: usize,
    pub fail: Cell<bool>,
    pub calls: RefCell<Vec<(Vec<String>, EmbedMode)>>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(dimension: usize) -> Self {
        let embedder = Self::new(dimension);
        embedder.fail.set(true);
        embedder
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for c in text.chars() {
            vector[c as usize % self.dimension] += 1.0;
        }
        vector
    }
}

impl EmbeddingClient for FakeEmbedder {
    fn embed(
        &self,
        texts: &[String],
        mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, RemoteServiceError> {
        self.calls.borrow_mut().push((texts.to_vec(), mode));
        if self.fail.get() {
            return Err(transport_error(Service::Embedding));
        }
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Records prompts and answers with a fixed reply
pub(crate) struct FakeChat {
    pub reply: String,
    pub fail: Cell<bool>,
    pub prompts: RefCell<Vec<(String, String)>>,
}

impl FakeChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: Cell::new(false),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl ChatCompletion for FakeChat {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, RemoteServiceError> {
        self.prompts
            .borrow_mut()
            .push((model.to_string(), prompt.to_string()));
        if self.fail.get() {
            return Err(transport_error(Service::Generation));
        }
        Ok(self.reply.clone())
    }
}

/// In-memory index that counts calls and can be told to fail
#[derive(Default)]
pub(crate) struct RecordingIndex {
    pub inner: InMemoryIndex,
    pub creates: Cell<usize>,
    pub upserts: RefCell<Vec<Vec<Record>>>,
    pub queries: Cell<usize>,
    pub fail_upsert: Cell<bool>,
    pub fail_query: Cell<bool>,
}

impl VectorIndex for RecordingIndex {
    fn list_collections(&self) -> Result<BTreeSet<String>, RemoteServiceError> {
        self.inner.list_collections()
    }

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), RemoteServiceError> {
        self.creates.set(self.creates.get() + 1);
        self.inner.create_collection(spec)
    }

    fn upsert(
        &self,
        collection: &CollectionHandle,
        records: &[Record],
    ) -> Result<usize, RemoteServiceError> {
        if self.fail_upsert.get() {
            return Err(transport_error(Service::VectorIndex));
        }
        self.upserts.borrow_mut().push(records.to_vec());
        self.inner.upsert(collection, records)
    }

    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<Match>, RemoteServiceError> {
        self.queries.set(self.queries.get() + 1);
        if self.fail_query.get() {
            return Err(transport_error(Service::VectorIndex));
        }
        self.inner.query(collection, vector, top_k, include_payload)
    }
}

/// Returns canned matches regardless of the query vector
pub(crate) struct ScriptedIndex {
    pub matches: Vec<Match>,
}

impl VectorIndex for ScriptedIndex {
    fn list_collections(&self) -> Result<BTreeSet<String>, RemoteServiceError> {
        Ok(BTreeSet::new())
    }

    fn create_collection(&self, _spec: &CollectionSpec) -> Result<(), RemoteServiceError> {
        Ok(())
    }

    fn upsert(
        &self,
        _collection: &CollectionHandle,
        records: &[Record],
    ) -> Result<usize, RemoteServiceError> {
        Ok(records.len())
    }

    fn query(
        &self,
        _collection: &CollectionHandle,
        _vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<Match>, RemoteServiceError> {
        Ok(self
            .matches
            .iter()
            .take(top_k)
            .cloned()
            .map(|mut found| {
                if !include_payload {
                    found.payload = None;
                }
                found
            })
            .collect())
    }
}
