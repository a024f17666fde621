//! Request targets and response records
//!
//! A [`ResponseRecord`] is produced once per executed request and never
//! mutated afterwards; every accessor borrows.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

/// HTTP method of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to issue: method, path template, parameters, headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTarget {
    pub method: HttpMethod,
    /// Path template, e.g. `/api/test/user/{id}`
    pub path: String,
    /// Raw values substituted into `{name}` placeholders (encoded by the executor)
    pub path_params: BTreeMap<String, String>,
    /// Query pairs in send order
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    /// Send over `http://` even when the base URL is `https://`
    pub plain_http: bool,
}

impl EndpointTarget {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: BTreeMap::new(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            plain_http: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn over_plain_http(mut self) -> Self {
        self.plain_http = true;
        self
    }

    /// Path with placeholders filled verbatim (unencoded), for labels and logs.
    #[must_use]
    pub fn rendered_path(&self) -> String {
        let mut path = self.path.clone();
        for (name, value) in &self.path_params {
            path = path.replace(&format!("{{{name}}}"), value);
        }
        path
    }

    /// Operation label, e.g. `GET /api/test/user/10?gender=any`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = format!("{} {}", self.method, self.rendered_path());
        if !self.query.is_empty() {
            let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            label.push('?');
            label.push_str(&query.join("&"));
        }
        if self.plain_http {
            label.push_str(" (plain http)");
        }
        label
    }
}

/// Response headers with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; repeated names are joined with `", "`.
    pub fn append(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Response body: parsed JSON when possible, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    /// Parse `raw` as JSON, falling back to text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Text(raw.to_string()), Self::Json)
    }

    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

/// One observed HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    label: String,
    status: u16,
    headers: Headers,
    raw: String,
    body: Body,
    duration: Duration,
}

impl ResponseRecord {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        status: u16,
        headers: Headers,
        raw: String,
        duration: Duration,
    ) -> Self {
        let body = Body::parse(&raw);
        Self {
            label: label.into(),
            status,
            headers,
            raw,
            body,
            duration,
        }
    }

    /// Operation label of the request that produced this record.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Body exactly as received.
    #[must_use]
    pub fn raw_body(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        self.body.as_json()
    }

    /// Top-level JSON field, `None` when absent or the body is not an object.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.json().and_then(|v| v.as_object()).and_then(|o| o.get(name))
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}
