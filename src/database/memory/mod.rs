
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::{CollectionHandle, CollectionSpec, Match, Metric, Record, VectorIndex};
use crate::remote::{RemoteFailure, RemoteServiceError, Service};

/// Exact-search vector index held in process memory
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collections: Mutex<HashMap<String, Collection>>,
}

#[derive(Debug)]
struct Collection {
    spec: CollectionSpec,
    /// Records per namespace; the default namespace is the empty string
    namespaces: HashMap<String, BTreeMap<String, Record>>,
}

impl InMemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in the handle's namespace
    #[inline]
    pub fn record_count(&self, collection: &CollectionHandle) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection.name)
            .and_then(|c| c.namespaces.get(namespace_key(collection)))
            .map_or(0, BTreeMap::len)
    }
}

fn namespace_key(collection: &CollectionHandle) -> &str {
    collection.namespace.as_deref().unwrap_or_default()
}

fn not_found(name: &str) -> RemoteServiceError {
    RemoteServiceError::new(
        Service::VectorIndex,
        RemoteFailure::NotFound,
        format!("Collection {} does not exist", name),
    )
}

fn check_dimension(spec: &CollectionSpec, vector: &[f32]) -> Result<(), RemoteServiceError> {
    if vector.len() == spec.dimension {
        Ok(())
    } else {
        Err(RemoteServiceError::new(
            Service::VectorIndex,
            RemoteFailure::Rejected(400),
            format!(
                "Vector dimension {} does not match collection {} dimension {}",
                vector.len(),
                spec.name,
                spec.dimension
            ),
        ))
    }
}

/// Higher is more similar for every metric
fn similarity(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => cosine_similarity(a, b),
        Metric::Dotproduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Metric::Euclidean => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

/// Cosine similarity; zero-length vectors score 0
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorIndex for InMemoryIndex {
    fn list_collections(&self) -> Result<BTreeSet<String>, RemoteServiceError> {
        Ok(self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), RemoteServiceError> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        collections.entry(spec.name.clone()).or_insert_with(|| {
            debug!("Creating in-memory collection {}", spec.name);
            Collection {
                spec: spec.clone(),
                namespaces: HashMap::new(),
            }
        });
        Ok(())
    }

    fn upsert(
        &self,
        collection: &CollectionHandle,
        records: &[Record],
    ) -> Result<usize, RemoteServiceError> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = collections
            .get_mut(&collection.name)
            .ok_or_else(|| not_found(&collection.name))?;

        // Validate the whole batch before writing any of it
        for record in records {
            check_dimension(&stored.spec, &record.vector)?;
        }

        let namespace = stored
            .namespaces
            .entry(namespace_key(collection).to_string())
            .or_default();
        for record in records {
            namespace.insert(record.id.clone(), record.clone());
        }

        Ok(records.len())
    }

    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<Match>, RemoteServiceError> {
        let collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = collections
            .get(&collection.name)
            .ok_or_else(|| not_found(&collection.name))?;
        check_dimension(&stored.spec, vector)?;

        let Some(records) = stored.namespaces.get(namespace_key(collection)) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Match> = records
            .values()
            .map(|record| Match {
                id: record.id.clone(),
                score: similarity(stored.spec.metric, vector, &record.vector),
                payload: include_payload.then(|| record.payload.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}
