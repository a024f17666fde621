//! Project configuration for contract runs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard ceiling for opt-in transport retries.
pub const MAX_TRANSPORT_RETRIES: u32 = 3;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the user-directory API
    pub base_url: String,

    /// Fixture file with known-good input values (JSON or YAML)
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,

    /// HTTP headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-call SLA in milliseconds; every contract asserts `duration < limit`
    #[serde(default = "default_response_time_limit_ms")]
    pub response_time_limit_ms: u64,

    /// Token the `content-type` response header must contain
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Transport ceiling for a single call in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Explicit scenario budget; defaults to SLA x declared call count
    #[serde(default)]
    pub scenario_timeout_ms: Option<u64>,

    /// Extra attempts after a transport failure (clamped to 3, off by default)
    #[serde(default)]
    pub transport_retries: u32,

    /// Seed for id sampling; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_fixtures() -> PathBuf {
    PathBuf::from("fixtures/apiData.json")
}

const fn default_response_time_limit_ms() -> u64 {
    5000
}

fn default_content_type() -> String {
    "application/json;charset=UTF-8".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://hr-challenge.dev.tapyou.com".to_string(),
            fixtures: default_fixtures(),
            headers: HashMap::new(),
            response_time_limit_ms: default_response_time_limit_ms(),
            content_type: default_content_type(),
            request_timeout_ms: default_request_timeout_ms(),
            scenario_timeout_ms: None,
            transport_retries: 0,
            seed: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.apicheck.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".apicheck.toml", ".apicheck.json", "apicheck.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    #[must_use]
    pub const fn response_time_limit(&self) -> Duration {
        Duration::from_millis(self.response_time_limit_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry count actually applied, never above [`MAX_TRANSPORT_RETRIES`].
    #[must_use]
    pub fn effective_retries(&self) -> u32 {
        self.transport_retries.min(MAX_TRANSPORT_RETRIES)
    }

    /// Budget for a scenario that declares `calls` network calls.
    ///
    /// An explicit `scenario_timeout_ms` wins; otherwise each call gets the
    /// SLA once per attempt.
    #[must_use]
    pub fn scenario_budget(&self, calls: u32) -> Duration {
        if let Some(ms) = self.scenario_timeout_ms {
            return Duration::from_millis(ms);
        }
        let attempts = u64::from(self.effective_retries()) + 1;
        let calls = u64::from(calls.max(1));
        Duration::from_millis(
            self.response_time_limit_ms
                .saturating_mul(calls)
                .saturating_mul(attempts),
        )
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# apicheck configuration

# User-directory API under test
base_url = "https://hr-challenge.dev.tapyou.com"

# Fixture file supplying a known-valid user id ({"id": 10})
fixtures = "fixtures/apiData.json"

# Per-call SLA in milliseconds
response_time_limit_ms = 5000

# Required content-type token
content_type = "application/json;charset=UTF-8"

# Transport ceiling per call in milliseconds
request_timeout_ms = 10000

# Scenario budget override (default: SLA x calls)
# scenario_timeout_ms = 30000

# Retries on transport failure only (max 3, default 0)
# transport_retries = 1

# Fixed seed for id sampling
# seed = 42

# Extra request headers
# [headers]
# X-Trace = "apicheck"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
