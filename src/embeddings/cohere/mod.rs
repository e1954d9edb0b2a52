
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{EmbedMode, EmbeddingClient};
use crate::config::{CohereConfig, ConfigError, HttpConfig};
use crate::remote::{self, HttpClient, RemoteServiceError, Service};

/// Embedding client for the Cohere embed API
#[derive(Debug, Clone)]
pub struct CohereEmbedder {
    http: HttpClient,
    embed_url: Url,
    model: String,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbedder {
    #[inline]
    pub fn new(
        cohere: &CohereConfig,
        http: &HttpConfig,
        api_key: &str,
    ) -> Result<Self, ConfigError> {
        let base_url = cohere.base_url()?;
        let embed_url = remote::endpoint(&base_url, "/v1/embed")
            .map_err(|_| ConfigError::InvalidUrl(cohere.base_url.clone()))?;

        Ok(Self {
            http: HttpClient::new(Service::Embedding, http)
                .with_header("Authorization", format!("Bearer {}", api_key)),
            embed_url,
            model: cohere.embed_model.clone(),
            batch_size: cohere.embed_batch_size.max(1),
        })
    }

    /// Replace the underlying HTTP client, keeping its auth header
    #[inline]
    pub fn with_http(mut self, configure: impl FnOnce(HttpClient) -> HttpClient) -> Self {
        self.http = configure(self.http);
        self
    }

    fn embed_single_batch(
        &self,
        texts: &[String],
        mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, RemoteServiceError> {
        let request = EmbedRequest {
            model: &self.model,
            texts,
            input_type: mode.input_type(),
        };

        let response: EmbedResponse = self.http.post_json(&self.embed_url, &request)?;

        if response.embeddings.len() != texts.len() {
            return Err(RemoteServiceError::malformed(
                Service::Embedding,
                format!(
                    "Mismatch between request and response counts: {} vs {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }

        Ok(response.embeddings)
    }
}

impl EmbeddingClient for CohereEmbedder {
    fn embed(
        &self,
        texts: &[String],
        mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, RemoteServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts in {} mode", texts.len(), mode);

        let mut embeddings = Vec::with_capacity(texts.len());

        // The API caps the number of texts per request
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_single_batch(batch, mode)?);
        }

        debug!(
            "Generated {} embeddings with {} dimensions",
            embeddings.len(),
            embeddings.first().map_or(0, Vec::len)
        );

        Ok(embeddings)
    }
}
