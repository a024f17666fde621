//! Request executor: one live HTTP call per target, no caching
//!
//! Any HTTP status is a valid [`ResponseRecord`]. Only transport problems
//! (DNS, refused connection, per-call timeout, broken body stream) are
//! errors, and only those are eligible for the opt-in bounded retry.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use tracing::{debug, warn};

use apicheck_core::{Config, EndpointTarget, Headers, HttpMethod, ResponseRecord};

/// Transport-level failure, reported apart from contract violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid target URL: {0}")]
    Url(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("no response within {0} ms")]
    Timeout(u64),
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Malformed URLs, headers and requests fail the same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Url(_) | Self::Invalid(_))
    }
}

/// Async HTTP executor bound to one base URL.
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
    timeout: Duration,
    retries: u32,
}

impl Executor {
    /// Build an executor from config.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL does not parse, a configured header is not
    /// legal HTTP, or the client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| TransportError::Url(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Url(format!(
                "{}: cannot be used as a base",
                config.base_url
            )));
        }
        let headers = header_map(&config.headers)?;
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            headers,
            timeout,
            retries: config.effective_retries(),
        })
    }

    /// Resolve a target against the base URL.
    ///
    /// Each path segment is percent-encoded on its own, so a path parameter
    /// such as `" or 1=1 --"` stays one segment and reaches the server intact.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Url`] if a placeholder has no value.
    pub fn url_for(&self, target: &EndpointTarget) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::Url(format!("{}: cannot be a base", self.base_url)))?;
            segments.pop_if_empty();
            for segment in target.path.split('/').filter(|s| !s.is_empty()) {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => {
                        let value = target.path_params.get(name).ok_or_else(|| {
                            TransportError::Url(format!(
                                "{}: no value for path parameter '{name}'",
                                target.path
                            ))
                        })?;
                        segments.push(value);
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }
        if !target.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&target.query);
        }
        if target.plain_http && url.scheme() != "http" {
            url.set_scheme("http")
                .map_err(|()| TransportError::Url(format!("{url}: cannot switch to http")))?;
        }
        Ok(url)
    }

    /// Execute a target, retrying transport failures up to the configured bound.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable error for an unusable URL or header, otherwise
    /// the last transport error once attempts are exhausted.
    pub async fn execute(&self, target: &EndpointTarget) -> Result<ResponseRecord, TransportError> {
        let url = self.url_for(target)?;
        let mut headers = self.headers.clone();
        headers.extend(header_map(&target.headers)?);
        let label = target.label();
        let mut attempt = 0;
        loop {
            match self.execute_once(target.method, &url, &headers, &label).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(request = %label, attempt, error = %e, "transport failure, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_once(
        &self,
        method: HttpMethod,
        url: &Url,
        headers: &HeaderMap,
        label: &str,
    ) -> Result<ResponseRecord, TransportError> {
        let req = self
            .client
            .request(method_of(method), url.clone())
            .headers(headers.clone());

        let start = Instant::now();
        let resp = req.send().await.map_err(|e| self.classify(&e))?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)))
            .collect();
        let raw = resp.text().await.map_err(|e| self.classify(&e))?;
        let duration = start.elapsed();

        debug!(
            request = %label,
            status,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            bytes = raw.len(),
            "response"
        );

        Ok(ResponseRecord::new(label, status, headers, raw, duration))
    }

    fn classify(&self, err: &reqwest::Error) -> TransportError {
        if err.is_builder() {
            TransportError::Invalid(err.to_string())
        } else if err.is_timeout() {
            TransportError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Parse headers, rejecting any name or value that is not legal HTTP.
fn header_map<'a, I>(headers: I) -> Result<HeaderMap, TransportError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Invalid(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Invalid(format!("header {name} value {value:?}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

const fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
