//! Static fixture values (known-valid ids) loaded once per run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Key holding the known-valid user id.
pub const USER_ID_KEY: &str = "id";

/// Immutable key-value fixture data.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixtures {
    source: PathBuf,
    values: BTreeMap<String, Value>,
}

impl Fixtures {
    /// Load fixtures from a JSON or YAML file.
    ///
    /// `.yaml`/`.yml` are parsed as YAML, `.json` as JSON; anything else is
    /// sniffed (leading `{` means JSON).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a key-value map.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FixtureError::Io(path.to_path_buf(), e.to_string()))?;
        let values = parse_fixtures(path, &content)?;
        Ok(Self {
            source: path.to_path_buf(),
            values,
        })
    }

    /// Build fixtures from in-memory values.
    #[must_use]
    pub fn from_values(values: BTreeMap<String, Value>) -> Self {
        Self {
            source: PathBuf::from("<memory>"),
            values,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The known-valid user id.
    ///
    /// Accepts either a JSON integer or a string of digits.
    ///
    /// # Errors
    ///
    /// Returns error if the key is missing or not a non-negative integer.
    pub fn user_id(&self) -> Result<u64, FixtureError> {
        let value = self
            .values
            .get(USER_ID_KEY)
            .ok_or_else(|| FixtureError::Missing(USER_ID_KEY.to_string()))?;
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| FixtureError::Invalid {
            key: USER_ID_KEY.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_fixtures(path: &Path, content: &str) -> Result<BTreeMap<String, Value>, FixtureError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let is_json = match ext.as_str() {
        "json" => true,
        "yaml" | "yml" => false,
        _ => content.trim_start().starts_with('{'),
    };

    if is_json {
        serde_json::from_str(content).map_err(|e| FixtureError::Parse(format!("Invalid JSON: {e}")))
    } else {
        serde_yml::from_str(content).map_err(|e| FixtureError::Parse(format!("Invalid YAML: {e}")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("fixture key '{0}' is missing")]
    Missing(String),
    #[error("fixture key '{key}' is not a non-negative integer: {value}")]
    Invalid { key: String, value: String },
}
