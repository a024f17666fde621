//! User identifier grammar of the directory lookup endpoint
//!
//! The server accepts a plain decimal integer that fits a 32-bit signed
//! integer and is greater than zero. Anything else is malformed and echoed
//! back in a `NumberFormatException` message, except whitespace-only input,
//! which the routing layer answers with 404 before parsing.

/// How the server is expected to treat a raw `{id}` path token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierClass {
    /// Parsed as a user id; 200 with the user or `user: null`
    Valid(u32),
    /// Empty or whitespace-only; 404 with `user: null`
    Blank,
    /// Rejected by the parser; 400 echoing the token
    Malformed,
}

/// Classify a raw path token.
#[must_use]
pub fn classify(token: &str) -> IdentifierClass {
    if token.trim().is_empty() {
        return IdentifierClass::Blank;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return IdentifierClass::Malformed;
    }
    match token.parse::<i32>() {
        Ok(n) if n > 0 => u32::try_from(n).map_or(IdentifierClass::Malformed, IdentifierClass::Valid),
        _ => IdentifierClass::Malformed,
    }
}

/// Error message the server returns for a malformed identifier.
#[must_use]
pub fn number_format_message(token: &str) -> String {
    format!("NumberFormatException: For input string: \"{token}\"")
}
