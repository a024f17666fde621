//! Response contract rules
//!
//! No I/O. Every rule is a pure function of one [`ResponseRecord`] and
//! returns the first violated clause. Rules compose with `?`: a scenario
//! applies a base contract and then layers field assertions on top.

use std::time::Duration;

use serde_json::{Map, Value, json};

use apicheck_core::{Config, HttpMethod, ResponseRecord, Violation, number_format_message};

/// Thresholds shared by every contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractLimits {
    pub response_time_limit: Duration,
    /// Token the `content-type` header must contain
    pub content_type: String,
}

impl ContractLimits {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            response_time_limit: config.response_time_limit(),
            content_type: config.content_type.clone(),
        }
    }
}

impl Default for ContractLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

const ABSENT: &str = "<absent>";

// ── Base contracts ──

/// 200 with a success envelope.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn success_contract(record: &ResponseRecord, limits: &ContractLimits) -> Result<(), Violation> {
    expect_status(record, 200)?;
    expect_field(record, "isSuccess", &Value::Bool(true))?;
    expect_field(record, "errorCode", &json!(0))?;
    expect_field(record, "errorMessage", &Value::Null)?;
    expect_content_type(record, limits)?;
    expect_within_sla(record, limits)
}

/// 400 with JSON content type, within SLA. Body checks are layered by callers.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn error_contract(record: &ResponseRecord, limits: &ContractLimits) -> Result<(), Violation> {
    expect_status(record, 400)?;
    expect_content_type(record, limits)?;
    expect_within_sla(record, limits)
}

// ── Endpoint-specific contracts ──

/// Malformed `{id}`: error envelope echoing the token verbatim.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn malformed_id_contract(
    record: &ResponseRecord,
    limits: &ContractLimits,
    token: &str,
) -> Result<(), Violation> {
    error_contract(record, limits)?;
    expect_field(
        record,
        "errorMessage",
        &Value::String(number_format_message(token)),
    )?;
    expect_field(record, "user", &Value::Null)?;
    expect_field(record, "isSuccess", &Value::Bool(false))
}

/// Whitespace-only `{id}`: 404 with `user: null`, not a 400.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn not_found_contract(record: &ResponseRecord, limits: &ContractLimits) -> Result<(), Violation> {
    expect_status(record, 404)?;
    expect_present(record, "errorMessage")?;
    expect_field(record, "user", &Value::Null)?;
    expect_within_sla(record, limits)
}

/// Unsupported method: 405 with fixed framework fields and no payload.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn method_not_allowed_contract(
    record: &ResponseRecord,
    limits: &ContractLimits,
    method: HttpMethod,
    payload_field: &str,
) -> Result<(), Violation> {
    expect_status(record, 405)?;
    expect_field(record, "error", &json!("Method Not Allowed"))?;
    expect_field(
        record,
        "message",
        &Value::String(format!("Request method '{method}' not supported")),
    )?;
    expect_within_sla(record, limits)?;
    expect_absent(record, payload_field)
}

/// Required query parameter missing: framework 400 without `idList`.
///
/// # Errors
///
/// Returns the first violated clause.
pub fn missing_parameter_contract(
    record: &ResponseRecord,
    limits: &ContractLimits,
    parameter: &str,
) -> Result<(), Violation> {
    error_contract(record, limits)?;
    expect_field(record, "error", &json!("Bad Request"))?;
    expect_field(
        record,
        "message",
        &Value::String(format!(
            "Required String parameter '{parameter}' is not present"
        )),
    )?;
    expect_absent(record, "idList")
}

// ── Payload extraction ──

fn user_envelope_schema() -> Value {
    json!({
        "type": "object",
        "required": ["user"],
        "properties": {
            "user": {
                "type": ["object", "null"],
                "required": ["id", "name", "gender", "age", "city", "registrationDate"],
                "properties": {
                    "id": {"type": "integer"}
                }
            }
        }
    })
}

fn id_list_schema() -> Value {
    json!({
        "type": "object",
        "required": ["idList"],
        "properties": {
            "idList": {"type": "array", "items": {"type": "integer"}}
        }
    })
}

/// Validate the body against a JSON Schema, reporting up to 5 errors.
///
/// # Errors
///
/// Returns a `schema` violation when the body is not JSON or does not match.
pub fn expect_schema(record: &ResponseRecord, schema: &Value) -> Result<(), Violation> {
    let Some(body) = record.json() else {
        return Err(Violation::new(
            "schema",
            "JSON body",
            truncate(record.raw_body(), 200),
        ));
    };
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| Violation::new("schema", "valid JSON Schema", e))?;
    let errors: Vec<String> = validator
        .iter_errors(body)
        .take(5)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Violation::new("schema", "body matching schema", errors.join("; ")))
    }
}

/// The `user` payload, `None` when the server returned `user: null`.
///
/// # Errors
///
/// Returns a `schema` violation if the envelope shape is wrong.
pub fn user_payload(record: &ResponseRecord) -> Result<Option<&Map<String, Value>>, Violation> {
    expect_schema(record, &user_envelope_schema())?;
    Ok(record.field("user").and_then(Value::as_object))
}

/// The `user` payload, which must be present.
///
/// # Errors
///
/// Returns a violation if the envelope is malformed or `user` is null.
pub fn required_user(record: &ResponseRecord) -> Result<&Map<String, Value>, Violation> {
    user_payload(record)?.ok_or_else(|| Violation::new("user", "user object", "null"))
}

/// The `idList` payload in server order.
///
/// # Errors
///
/// Returns a `schema` violation if `idList` is missing or not integers.
pub fn id_list(record: &ResponseRecord) -> Result<Vec<i64>, Violation> {
    expect_schema(record, &id_list_schema())?;
    Ok(record
        .field("idList")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default())
}

// ── Clause helpers ──

/// # Errors
///
/// Returns a `status` violation on mismatch.
pub fn expect_status(record: &ResponseRecord, expected: u16) -> Result<(), Violation> {
    if record.status() == expected {
        Ok(())
    } else {
        Err(Violation::new("status", expected, record.status()))
    }
}

/// Top-level body field must equal `expected` (absent never matches).
///
/// # Errors
///
/// Returns a violation named after the field.
pub fn expect_field(record: &ResponseRecord, name: &str, expected: &Value) -> Result<(), Violation> {
    expect_value(name, record.field(name), expected)
}

/// Compare an optional JSON value against an expected one.
///
/// # Errors
///
/// Returns a violation named `clause`.
pub fn expect_value(clause: &str, actual: Option<&Value>, expected: &Value) -> Result<(), Violation> {
    match actual {
        Some(v) if v == expected => Ok(()),
        Some(v) => Err(Violation::new(clause, expected, v)),
        None => Err(Violation::new(clause, expected, ABSENT)),
    }
}

/// Filter value as the server echoes it: strings compare verbatim, numbers
/// by their decimal rendering (`age=18` may come back as `"18"` or `18`).
///
/// # Errors
///
/// Returns a violation named `clause`.
pub fn expect_filter_match(clause: &str, actual: Option<&Value>, expected: &str) -> Result<(), Violation> {
    let matches = match actual {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(Violation::new(
            clause,
            format!("{expected:?}"),
            actual.map_or_else(|| ABSENT.to_string(), ToString::to_string),
        ))
    }
}

/// # Errors
///
/// Returns a violation if the field is absent.
pub fn expect_present(record: &ResponseRecord, name: &str) -> Result<(), Violation> {
    if record.field(name).is_some() {
        Ok(())
    } else {
        Err(Violation::new(name, "present", ABSENT))
    }
}

/// # Errors
///
/// Returns a violation if the field exists, even as `null`.
pub fn expect_absent(record: &ResponseRecord, name: &str) -> Result<(), Violation> {
    match record.field(name) {
        None => Ok(()),
        Some(v) => Err(Violation::new(name, ABSENT, v)),
    }
}

/// # Errors
///
/// Returns a `content-type` violation if the header is missing or lacks the token.
pub fn expect_content_type(record: &ResponseRecord, limits: &ContractLimits) -> Result<(), Violation> {
    match record.header("content-type") {
        Some(ct) if ct.contains(&limits.content_type) => Ok(()),
        Some(ct) => Err(Violation::new(
            "content-type",
            format!("contains {:?}", limits.content_type),
            format!("{ct:?}"),
        )),
        None => Err(Violation::new(
            "content-type",
            format!("contains {:?}", limits.content_type),
            ABSENT,
        )),
    }
}

/// # Errors
///
/// Returns a `duration` violation when the SLA is reached or exceeded.
pub fn expect_within_sla(record: &ResponseRecord, limits: &ContractLimits) -> Result<(), Violation> {
    if record.duration() < limits.response_time_limit {
        Ok(())
    } else {
        Err(Violation::new(
            "duration",
            format!("< {} ms", limits.response_time_limit.as_millis()),
            format!("{} ms", record.duration_ms()),
        ))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
