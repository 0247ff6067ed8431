//! Error types and the service error-code mapping.
//!
//! Failure taxonomy: transport (network-level), step (application-level
//! non-2xx or a reported error step), structural (expected field missing),
//! timeout (poll budget exhausted), and request-format (bad inbound
//! multipart). Each is a distinct variant so callers can tell "the network
//! failed" apart from "the remote service returned an error document".

use serde_json::Value;

/// Errors raised while driving the verification step sequence.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Network-level failure (connection refused, DNS, timeout).
    #[error("network error: {message}")]
    Transport { message: String },

    /// A step returned a bad status or an error-marked body.
    #[error("{step} failed: {message}")]
    Step {
        step: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// A step response lacked an expected field.
    #[error("{message}")]
    Structural { message: String },

    /// The document upload did not report a 2xx status.
    #[error("document upload failed with status {status}")]
    Upload { status: u16 },
}

impl WorkflowError {
    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::Transport { message }
    }

    pub fn step(step: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Step {
            step,
            status,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }
}

/// Errors raised by the mailbox scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("mailbox connection failed: {message}")]
    Connect { message: String },

    #[error("mailbox login failed: {message}")]
    Login { message: String },

    /// Select, search or fetch failure inside an established session.
    #[error("mailbox {stage} failed: {message}")]
    Session {
        stage: &'static str,
        message: String,
    },

    #[error("mailbox scan is not configured")]
    NotConfigured,
}

/// Client-format errors for an inbound verification request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The Content-Type header carried no multipart boundary token.
    #[error("invalid content type: missing multipart boundary")]
    MissingBoundary,

    #[error("missing form field: {name}")]
    MissingField { name: String },

    #[error("document exceeds maximum size of {limit} bytes")]
    DocumentTooLarge { limit: usize },
}

/// Fixed machine error-code to human message table.
///
/// Codes are the service's `errorIds` values; unknown codes fall through to
/// [`failure_message`]'s free-text handling.
pub fn message_for_error_id(id: &str) -> Option<&'static str> {
    Some(match id {
        "noVerification" => "verification ID is invalid or already consumed",
        "expiredVerification" => "verification link has expired",
        "underAge" => "age requirement not met",
        "invalidOrganization" => "organization is not eligible for this program",
        "maxAttemptsExceeded" => "maximum verification attempts exceeded",
        "noProgram" => "verification program not found",
        "docReviewLimitExceeded" => "document review limit reached",
        _ => return None,
    })
}

const MAX_RAW_ERROR_LEN: usize = 140;
const DEFAULT_FAILURE_MESSAGE: &str = "verification failed";

/// Derive a human-readable failure message from an error-shaped step body.
///
/// Resolution order: first mapped `errorIds` entry, then known substrings of
/// the free-text `systemErrorMessage`, then a truncated copy of it, then any
/// unmapped codes verbatim, then an opaque default.
pub fn failure_message(body: &Value) -> String {
    let ids: Vec<&str> = body
        .get("errorIds")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for id in &ids {
        if let Some(msg) = message_for_error_id(id) {
            return msg.to_string();
        }
    }

    if let Some(system) = body.get("systemErrorMessage").and_then(Value::as_str) {
        if let Some(msg) = classify_system_error(system) {
            return msg.to_string();
        }
        if !system.is_empty() {
            return truncate(system, MAX_RAW_ERROR_LEN);
        }
    }

    if !ids.is_empty() {
        return format!("verification failed: {}", ids.join(", "));
    }

    DEFAULT_FAILURE_MESSAGE.to_string()
}

/// Known-substring scan of the free-text system error field.
fn classify_system_error(message: &str) -> Option<&'static str> {
    let msg = message.to_lowercase();
    if msg.contains("rate limit") || msg.contains("too many requests") {
        Some("the service is rate limiting requests")
    } else if msg.contains("timeout") || msg.contains("timed out") {
        Some("the service timed out processing the request")
    } else if msg.contains("organization") {
        Some("organization is not eligible for this program")
    } else if msg.contains("document") {
        Some("the submitted document was not accepted")
    } else {
        None
    }
}

fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_id_table_wins_over_free_text() {
        let body = json!({
            "currentStep": "error",
            "errorIds": ["underAge"],
            "systemErrorMessage": "organization rejected"
        });
        assert_eq!(failure_message(&body), "age requirement not met");
    }

    #[test]
    fn no_verification_maps_to_human_string() {
        let body = json!({ "errorIds": ["noVerification"] });
        assert_eq!(
            failure_message(&body),
            "verification ID is invalid or already consumed"
        );
    }

    #[test]
    fn unmapped_codes_are_surfaced_verbatim() {
        let body = json!({ "errorIds": ["somethingNew"] });
        assert_eq!(failure_message(&body), "verification failed: somethingNew");
    }

    #[test]
    fn classifiable_free_text_wins_over_unmapped_codes() {
        let body = json!({
            "errorIds": ["somethingNew"],
            "systemErrorMessage": "rate limit exceeded"
        });
        assert_eq!(
            failure_message(&body),
            "the service is rate limiting requests"
        );
    }

    #[test]
    fn raw_free_text_wins_over_unmapped_codes() {
        let body = json!({
            "errorIds": ["somethingNew"],
            "systemErrorMessage": "upstream said no"
        });
        assert_eq!(failure_message(&body), "upstream said no");
    }

    #[test]
    fn free_text_substring_fallback() {
        let body = json!({ "systemErrorMessage": "Upstream Timeout while validating" });
        assert_eq!(
            failure_message(&body),
            "the service timed out processing the request"
        );
    }

    #[test]
    fn free_text_truncation_fallback() {
        let long = "x".repeat(400);
        let body = json!({ "systemErrorMessage": long });
        let msg = failure_message(&body);
        assert!(msg.len() < 160);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn empty_body_yields_opaque_default() {
        assert_eq!(failure_message(&json!({})), "verification failed");
    }
}
