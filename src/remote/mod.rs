// Remote service plumbing
// Shared blocking HTTP client with per-call timeouts and bounded retry


use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::HttpConfig;

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// The remote capability a request was addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Embedding,
    VectorIndex,
    Generation,
}

impl fmt::Display for Service {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::VectorIndex => "vector index",
            Self::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Classification of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Connection, DNS, timeout or socket failure
    Transport,
    /// HTTP 5xx
    Server(u16),
    /// HTTP 401 or 403
    Auth(u16),
    /// HTTP 429
    Quota,
    /// HTTP 409
    Conflict,
    /// HTTP 404, or an unknown collection in a local index
    NotFound,
    /// Any other 4xx
    Rejected(u16),
    /// The response could not be decoded or did not match the request
    MalformedResponse,
}

impl RemoteFailure {
    /// Classify an HTTP status code
    #[inline]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth(status),
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::Quota,
            500.. => Self::Server(status),
            _ => Self::Rejected(status),
        }
    }

    /// Only transport and server failures are worth another attempt
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transport | Self::Server(_))
    }
}

#[derive(Debug, Error)]
#[error("{service} request failed ({kind:?}): {message}")]
pub struct RemoteServiceError {
    pub service: Service,
    pub kind: RemoteFailure,
    pub message: String,
}

impl RemoteServiceError {
    #[inline]
    pub fn new(service: Service, kind: RemoteFailure, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    #[inline]
    pub fn malformed(service: Service, message: impl Into<String>) -> Self {
        Self::new(service, RemoteFailure::MalformedResponse, message)
    }
}

/// Blocking JSON-over-HTTP client for one remote service
#[derive(Clone)]
pub struct HttpClient {
    service: Service,
    agent: ureq::Agent,
    headers: Vec<(String, String)>,
    retry_attempts: u32,
    initial_backoff: Duration,
}

// Header values carry API keys, so only their names are shown
impl fmt::Debug for HttpClient {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self
            .headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        f.debug_struct("HttpClient")
            .field("service", &self.service)
            .field("headers", &header_names)
            .field("retry_attempts", &self.retry_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    #[inline]
    pub fn new(service: Service, config: &HttpConfig) -> Self {
        Self {
            service,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            headers: Vec::new(),
            retry_attempts: config.retry_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }

    /// Attach a header sent with every request
    #[inline]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    #[inline]
    pub fn service(&self) -> Service {
        self.service
    }

    /// GET `url` and decode the JSON response body
    #[inline]
    pub fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, RemoteServiceError> {
        debug!("GET {}", url);
        let body = self.make_request_with_retry(url, || {
            self.apply_headers(self.agent.get(url.as_str()))
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        self.decode(&body)
    }

    /// POST `payload` as JSON to `url` and decode the JSON response body
    #[inline]
    pub fn post_json<B, T>(&self, url: &Url, payload: &B) -> Result<T, RemoteServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request_json = serde_json::to_string(payload).map_err(|e| {
            RemoteServiceError::new(
                self.service,
                RemoteFailure::Rejected(0),
                format!("Failed to serialize request: {}", e),
            )
        })?;

        debug!("POST {} ({} bytes)", url, request_json.len());
        let body = self.make_request_with_retry(url, || {
            self.apply_headers(self.agent.post(url.as_str()))
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        self.decode(&body)
    }

    fn apply_headers<B>(&self, mut request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T, RemoteServiceError> {
        // Some endpoints answer with an empty body on success
        let body = if body.trim().is_empty() { "{}" } else { body };
        serde_json::from_str(body).map_err(|e| {
            RemoteServiceError::malformed(self.service, format!("Failed to parse response: {}", e))
        })
    }

    fn make_request_with_retry<F>(
        &self,
        url: &Url,
        mut request_fn: F,
    ) -> Result<String, RemoteServiceError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            let error = match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => self.classify(&error),
            };

            if !error.kind.is_transient() {
                warn!("{} (not retrying)", error);
                return Err(error);
            }

            warn!("{}, attempt {}/{}", error, attempt, self.retry_attempts);
            last_error = Some(error);

            if attempt < self.retry_attempts {
                let delay = self.backoff_delay(attempt);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error.unwrap_or_else(|| {
            RemoteServiceError::new(
                self.service,
                RemoteFailure::Transport,
                "Request failed after retries",
            )
        }))
    }

    /// Delay before the retry that follows `attempt`, saturating instead of overflowing
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1)))
    }

    fn classify(&self, error: &ureq::Error) -> RemoteServiceError {
        let kind = match error {
            ureq::Error::StatusCode(status) => RemoteFailure::from_status(*status),
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => RemoteFailure::Transport,
            _ => RemoteFailure::Rejected(0),
        };
        RemoteServiceError::new(self.service, kind, error.to_string())
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Join `path` onto `base`, keeping any path prefix `base` already has
#[inline]
pub fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut joined = base.as_str().trim_end_matches('/').to_string();
    joined.push('/');
    joined.push_str(path.trim_start_matches('/'));
    Url::parse(&joined)
}
