// Vector index module
// Collection lifecycle, record upserts and similarity queries behind one trait

pub mod memory;
pub mod pinecone;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::remote::RemoteServiceError;

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;

/// Similarity metric a collection is created with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl fmt::Display for Metric {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        };
        f.write_str(name)
    }
}

/// Everything needed to create a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
}

/// A populated collection that questions can be asked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    /// Collection name
    pub name: String,
    /// Namespace the document's records were written to, `None` for the default one
    pub namespace: Option<String>,
    /// Vector length the collection accepts
    pub dimension: usize,
}

/// Data stored alongside a vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    /// The original chunk text
    pub text: String,
}

/// One vector record: chunk identity, embedding and payload
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A ranked query result
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub score: f32,
    /// Present when the query asked for payloads and the record has one
    pub payload: Option<Payload>,
}

/// A store of named vector collections
pub trait VectorIndex {
    /// Names of every collection that currently exists
    fn list_collections(&self) -> Result<BTreeSet<String>, RemoteServiceError>;

    /// Create a collection; creating one that already exists is not an error
    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), RemoteServiceError>;

    /// Insert or overwrite `records`, returning how many were written
    fn upsert(
        &self,
        collection: &CollectionHandle,
        records: &[Record],
    ) -> Result<usize, RemoteServiceError>;

    /// The `top_k` most similar records, most similar first
    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<Match>, RemoteServiceError>;
}
