//! Data model for a verification run and the mailbox scan.
//!
//! Wire names (`type`, `verificationId`, `redirectUrl`, `status`) are pinned
//! to the JSON contract callers already consume.

use crate::error::RequestError;
use crate::multipart::Part;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One end-to-end verification attempt.
///
/// Immutable for the lifetime of a run; owned by the workflow invocation
/// that consumes it. Exactly one session drives exactly one sequential pass
/// through the step sequence.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    pub verification_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: String,
    /// Raw document bytes, uploaded verbatim.
    pub document: Vec<u8>,
}

/// Form field carrying the document bytes.
pub const DOCUMENT_FIELD: &str = "studentCard";

impl VerificationSession {
    /// Build a session from decoded multipart parts.
    ///
    /// Text fields are required; the document must be present under
    /// [`DOCUMENT_FIELD`] and within `max_document_bytes`.
    pub fn from_parts(
        parts: &HashMap<String, Part>,
        max_document_bytes: usize,
    ) -> Result<Self, RequestError> {
        let text = |name: &str| -> Result<String, RequestError> {
            match parts.get(name) {
                Some(Part::Text(v)) if !v.is_empty() => Ok(v.clone()),
                _ => Err(RequestError::MissingField {
                    name: name.to_string(),
                }),
            }
        };
        let document = match parts.get(DOCUMENT_FIELD) {
            Some(Part::Bytes(b)) if !b.is_empty() => b.clone(),
            _ => {
                return Err(RequestError::MissingField {
                    name: DOCUMENT_FIELD.to_string(),
                })
            }
        };
        if document.len() > max_document_bytes {
            return Err(RequestError::DocumentTooLarge {
                limit: max_document_bytes,
            });
        }

        Ok(Self {
            verification_id: text("verificationId")?,
            first_name: text("firstName")?,
            last_name: text("lastName")?,
            email: text("email")?,
            birth_date: text("birthDate")?,
            document,
        })
    }
}

/// Severity of one log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Debug,
    Success,
    Warning,
    Error,
}

/// One chronological entry of a run's log; never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

/// Append-only, strictly chronological run log.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: LogLevel, message: String) {
        tracing::debug!(level = ?level, "{message}");
        self.entries.push(LogEntry { message, level });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Terminal value of one workflow run. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    pub success: bool,
    pub message: String,
    pub verification_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Last status document returned by the poll, when one was received.
    #[serde(rename = "status", skip_serializing_if = "Option::is_none")]
    pub final_status: Option<Value>,
}

impl WorkflowOutcome {
    pub fn failure(verification_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            verification_id: verification_id.to_string(),
            redirect_url: None,
            final_status: None,
        }
    }
}

/// One scanned message with its candidate verification links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    pub subject: String,
    pub from: String,
    pub date: String,
    pub links: Vec<String>,
}

/// Result of one mailbox scan invocation. Produced fresh per scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailScanResult {
    pub found: bool,
    pub emails: Vec<EmailRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with(document: Vec<u8>) -> HashMap<String, Part> {
        let mut parts = HashMap::new();
        for (k, v) in [
            ("verificationId", "abc123"),
            ("firstName", "Ada"),
            ("lastName", "Lovelace"),
            ("email", "ada@example.edu"),
            ("birthDate", "2002-04-01"),
        ] {
            parts.insert(k.to_string(), Part::Text(v.to_string()));
        }
        parts.insert(DOCUMENT_FIELD.to_string(), Part::Bytes(document));
        parts
    }

    #[test]
    fn session_from_complete_parts() {
        let session = VerificationSession::from_parts(&parts_with(vec![1, 2, 3]), 1024).unwrap();
        assert_eq!(session.verification_id, "abc123");
        assert_eq!(session.document, vec![1, 2, 3]);
    }

    #[test]
    fn missing_field_is_named() {
        let mut parts = parts_with(vec![1]);
        parts.remove("email");
        let err = VerificationSession::from_parts(&parts, 1024).unwrap_err();
        assert!(matches!(err, RequestError::MissingField { name } if name == "email"));
    }

    #[test]
    fn oversized_document_rejected() {
        let err = VerificationSession::from_parts(&parts_with(vec![0; 2048]), 1024).unwrap_err();
        assert!(matches!(err, RequestError::DocumentTooLarge { limit: 1024 }));
    }

    #[test]
    fn log_entry_serializes_level_as_type() {
        let entry = LogEntry {
            message: "ready".into(),
            level: LogLevel::Success,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "success");
    }

    #[test]
    fn run_log_preserves_append_order() {
        let mut log = RunLog::new();
        log.info("first");
        log.error("second");
        log.debug("third");
        let entries = log.into_entries();
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
    }
}
