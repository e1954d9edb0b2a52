
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::ChatCompletion;
use crate::config::{CohereConfig, ConfigError, HttpConfig};
use crate::remote::{self, HttpClient, RemoteServiceError, Service};

/// Chat client for the Cohere chat API
#[derive(Debug, Clone)]
pub struct CohereChat {
    http: HttpClient,
    chat_url: Url,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

impl CohereChat {
    #[inline]
    pub fn new(
        cohere: &CohereConfig,
        http: &HttpConfig,
        api_key: &str,
    ) -> Result<Self, ConfigError> {
        let base_url = cohere.base_url()?;
        let chat_url = remote::endpoint(&base_url, "/v1/chat")
            .map_err(|_| ConfigError::InvalidUrl(cohere.base_url.clone()))?;

        Ok(Self {
            http: HttpClient::new(Service::Generation, http)
                .with_header("Authorization", format!("Bearer {}", api_key)),
            chat_url,
        })
    }

    #[inline]
    pub fn with_http(mut self, configure: impl FnOnce(HttpClient) -> HttpClient) -> Self {
        self.http = configure(self.http);
        self
    }
}

impl ChatCompletion for CohereChat {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, RemoteServiceError> {
        let request = ChatRequest {
            model,
            message: prompt,
        };

        let response: ChatResponse = self.http.post_json(&self.chat_url, &request)?;
        debug!(
            "Chat model {} returned {} characters",
            model,
            response.text.len()
        );

        Ok(response.text)
    }
}
