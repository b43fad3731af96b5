//! Shared HTTP utilities for the Notes API workspace.
//!
//! Provides the structured error bodies, the mapping from domain errors to
//! HTTP status codes, and timestamp formatting. Kept framework-agnostic so
//! the server crate owns all axum types.

use chrono::{DateTime, SecondsFormat, Utc};
use domain::CoreError;
use std::time::SystemTime;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "title_exists" => "Note title already exists",
        "rate_limited" => "Too many requests",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Domain Error Mapping
// ============================================================================

/// HTTP status and error code for a domain error.
///
/// `TitleConflict` maps to 400, not 409.
pub fn status_for(err: &CoreError) -> (u16, &'static str) {
    match err {
        CoreError::NotFound => (404, "not_found"),
        CoreError::TitleConflict => (400, "title_exists"),
        CoreError::Validation(_) => (400, "bad_request"),
        CoreError::Storage(_) => (500, "internal"),
    }
}

/// Error body for a domain error. Storage details stay in the logs.
pub fn error_body(err: &CoreError) -> serde_json::Value {
    match err {
        CoreError::Storage(_) => json_err("internal"),
        other => json_error_with_message(status_for(other).1, &other.to_string()),
    }
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (millisecond precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_json_err() {
        let err = json_err("not_found");
        assert_eq!(err, serde_json::json!({"error": {"code": "not_found", "message": "Resource not found"}}));

        let err = json_err("rate_limited");
        assert_eq!(err["error"]["message"], "Too many requests");

        // Unknown code falls back to code as message
        let err = json_err("custom_error");
        assert_eq!(err, serde_json::json!({"error": {"code": "custom_error", "message": "custom_error"}}));
    }

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(&CoreError::NotFound), (404, "not_found"));
        assert_eq!(status_for(&CoreError::TitleConflict), (400, "title_exists"));
        assert_eq!(status_for(&CoreError::Validation("x".into())).0, 400);
        assert_eq!(status_for(&CoreError::Storage("disk".into())).0, 500);
    }

    #[test]
    fn test_error_body_hides_storage_detail() {
        let body = error_body(&CoreError::Storage("sqlite error: disk I/O".into()));
        assert_eq!(body, json_err("internal"));

        let body = error_body(&CoreError::TitleConflict);
        assert_eq!(
            body,
            serde_json::json!({"error": {"code": "title_exists", "message": "note title exists"}})
        );
    }

    #[test]
    fn test_system_time_to_rfc3339() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(system_time_to_rfc3339(t), "2023-11-14T22:13:20.123Z");
    }
}
