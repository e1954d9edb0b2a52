
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{CollectionHandle, CollectionSpec, Match, Metric, Payload, Record, VectorIndex};
use crate::config::{ConfigError, HttpConfig, IndexConfig, PineconeConfig};
use crate::remote::{self, HttpClient, RemoteFailure, RemoteServiceError, Service};

/// Records sent per upsert request, well under Pinecone's 2MB request limit for 1024-d vectors
const UPSERT_BATCH_SIZE: usize = 100;

/// Vector index backed by Pinecone serverless indexes
#[derive(Debug)]
pub struct PineconeIndex {
    http: HttpClient,
    control_plane: Url,
    readiness_timeout: Duration,
    readiness_poll: Duration,
    /// Data plane host per index name, filled from `describe`
    hosts: Mutex<HashMap<String, Url>>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: Metric,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VectorEntry<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Payload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl PineconeIndex {
    #[inline]
    pub fn new(
        pinecone: &PineconeConfig,
        index: &IndexConfig,
        http: &HttpConfig,
        api_key: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpClient::new(Service::VectorIndex, http)
                .with_header("Api-Key", api_key)
                .with_header("X-Pinecone-API-Version", pinecone.api_version.as_str()),
            control_plane: pinecone.control_plane_url()?,
            readiness_timeout: Duration::from_secs(index.readiness_timeout_seconds),
            readiness_poll: Duration::from_millis(index.readiness_poll_ms),
            hosts: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the underlying HTTP client settings, keeping its headers
    #[inline]
    pub fn with_http(mut self, configure: impl FnOnce(HttpClient) -> HttpClient) -> Self {
        self.http = configure(self.http);
        self
    }

    fn control_url(&self, path: &str) -> Result<Url, RemoteServiceError> {
        remote::endpoint(&self.control_plane, path).map_err(|e| {
            RemoteServiceError::new(
                Service::VectorIndex,
                RemoteFailure::Rejected(0),
                format!("Invalid control plane path {}: {}", path, e),
            )
        })
    }

    fn describe(&self, name: &str) -> Result<IndexDescription, RemoteServiceError> {
        let url = self.control_url(&format!("/indexes/{}", name))?;
        self.http.get_json(&url)
    }

    /// Poll `describe` until the index reports ready, caching its host
    fn wait_until_ready(&self, name: &str) -> Result<(), RemoteServiceError> {
        let started = Instant::now();

        loop {
            let description = self.describe(name)?;
            let (ready, state) = description
                .status
                .as_ref()
                .map_or((false, None), |s| (s.ready, s.state.as_deref()));

            if ready {
                if let Some(host) = description.host.as_deref() {
                    self.cache_host(name, host)?;
                }
                info!("Index {} is ready", name);
                return Ok(());
            }

            if started.elapsed() >= self.readiness_timeout {
                return Err(RemoteServiceError::new(
                    Service::VectorIndex,
                    RemoteFailure::Transport,
                    format!(
                        "Index {} not ready after {:?} (state: {})",
                        name,
                        self.readiness_timeout,
                        state.unwrap_or("unknown")
                    ),
                ));
            }

            debug!(
                "Index {} not ready yet (state: {}), polling again",
                name,
                state.unwrap_or("unknown")
            );
            std::thread::sleep(self.readiness_poll);
        }
    }

    fn cache_host(&self, name: &str, host: &str) -> Result<Url, RemoteServiceError> {
        let url = parse_host(host)?;
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), url.clone());
        Ok(url)
    }

    /// Data plane base URL for `name`, resolved once per index
    fn data_plane(&self, name: &str) -> Result<Url, RemoteServiceError> {
        let cached = self
            .hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(url) = cached {
            return Ok(url);
        }

        let description = self.describe(name)?;
        let host = description.host.ok_or_else(|| {
            RemoteServiceError::malformed(
                Service::VectorIndex,
                format!("Index {} has no host", name),
            )
        })?;
        self.cache_host(name, &host)
    }

    fn data_url(&self, name: &str, path: &str) -> Result<Url, RemoteServiceError> {
        let base = self.data_plane(name)?;
        remote::endpoint(&base, path).map_err(|e| {
            RemoteServiceError::malformed(
                Service::VectorIndex,
                format!("Invalid data plane URL for {}: {}", name, e),
            )
        })
    }
}

impl VectorIndex for PineconeIndex {
    fn list_collections(&self) -> Result<BTreeSet<String>, RemoteServiceError> {
        let url = self.control_url("/indexes")?;
        let list: IndexList = self.http.get_json(&url)?;

        debug!("Found {} indexes", list.indexes.len());
        Ok(list.indexes.into_iter().map(|index| index.name).collect())
    }

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), RemoteServiceError> {
        let url = self.control_url("/indexes")?;
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };

        info!(
            "Creating index {} ({} dimensions, {}, {}/{})",
            spec.name, spec.dimension, spec.metric, spec.cloud, spec.region
        );

        match self.http.post_json::<_, serde_json::Value>(&url, &request) {
            Ok(_) => {}
            Err(error) if error.kind == RemoteFailure::Conflict => {
                warn!("Index {} was created concurrently, reusing it", spec.name);
            }
            Err(error) => return Err(error),
        }

        self.wait_until_ready(&spec.name)
    }

    fn upsert(
        &self,
        collection: &CollectionHandle,
        records: &[Record],
    ) -> Result<usize, RemoteServiceError> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = self.data_url(&collection.name, "/vectors/upsert")?;
        let mut upserted = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|record| VectorEntry {
                        id: &record.id,
                        values: &record.vector,
                        metadata: &record.payload,
                    })
                    .collect(),
                namespace: collection.namespace.as_deref(),
            };

            let response: UpsertResponse = self.http.post_json(&url, &request)?;
            upserted += response.upserted_count;
        }

        debug!(
            "Upserted {} records into {} (namespace {:?})",
            upserted, collection.name, collection.namespace
        );
        Ok(upserted)
    }

    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<Match>, RemoteServiceError> {
        let url = self.data_url(&collection.name, "/query")?;
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: include_payload,
            include_values: false,
            namespace: collection.namespace.as_deref(),
        };

        let response: QueryResponse = self.http.post_json(&url, &request)?;

        Ok(response
            .matches
            .into_iter()
            .map(|found| Match {
                payload: include_payload
                    .then(|| payload_from_metadata(found.metadata.as_ref()))
                    .flatten(),
                id: found.id,
                score: found.score,
            })
            .collect())
    }
}

fn payload_from_metadata(metadata: Option<&serde_json::Value>) -> Option<Payload> {
    metadata
        .and_then(|m| m.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(|text| Payload {
            text: text.to_string(),
        })
}

/// Pinecone reports bare hostnames; tests and proxies may supply full URLs
fn parse_host(host: &str) -> Result<Url, RemoteServiceError> {
    let candidate = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    Url::parse(&candidate).map_err(|e| {
        RemoteServiceError::malformed(
            Service::VectorIndex,
            format!("Invalid index host {:?}: {}", host, e),
        )
    })
}
