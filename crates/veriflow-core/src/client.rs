//! Outbound HTTP against the verification service and the object store.
//!
//! Normalizes every response into `{status, body}`, where the body is parsed
//! JSON when possible and raw text otherwise — callers never see a JSON
//! parse failure. Transport failures (connection refused, DNS, timeout) are
//! a distinct error from application-level non-2xx statuses.

use crate::error::WorkflowError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Normalized result of one remote call.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub status: u16,
    pub body: ResponseBody,
}

/// Response payload: parsed JSON, or the raw text when parsing fails.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }

    /// The service's reported step, when the body carries one.
    pub fn current_step(&self) -> Option<&str> {
        self.as_json()?.get("currentStep")?.as_str()
    }

    /// Short representation for log lines.
    pub fn snippet(&self) -> String {
        let raw = match self {
            ResponseBody::Json(v) => v.to_string(),
            ResponseBody::Text(t) => t.clone(),
        };
        if raw.len() > 200 {
            let mut end = 200;
            while !raw.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &raw[..end])
        } else {
            raw
        }
    }
}

/// Result of the raw document upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadResult {
    pub success: bool,
    pub status: u16,
}

/// HTTP client for the verification service and the object store.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
}

impl ServiceClient {
    pub fn new(timeout_secs: u64) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WorkflowError::Transport {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// Issue one JSON request and normalize the response.
    ///
    /// `Content-Type: application/json` is always sent; a body is serialized
    /// only when provided.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<StepResult, WorkflowError> {
        debug!(method = %method, url = %url, "remote call");

        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| WorkflowError::transport(&e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| WorkflowError::transport(&e))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(json) => ResponseBody::Json(json),
            Err(_) => ResponseBody::Text(text),
        };

        debug!(status, "remote call completed");
        Ok(StepResult { status, body })
    }

    /// PUT raw bytes to an object-storage URL. Success is any 2xx; no retry.
    pub async fn upload_binary(
        &self,
        url: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResult, WorkflowError> {
        debug!(url = %url, size = bytes.len(), "binary upload");

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(|e| WorkflowError::transport(&e))?;

        Ok(UploadResult {
            success: response.status().is_success(),
            status: response.status().as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn malformed_json_falls_back_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ServiceClient::new(5).unwrap();
        let result = client
            .call(Method::GET, &format!("{}/broken", server.uri()), None)
            .await
            .unwrap();

        assert_eq!(result.status, 200);
        assert!(matches!(result.body, ResponseBody::Text(ref t) if t.contains("oops")));
    }

    #[tokio::test]
    async fn json_body_and_content_type_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/step"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"k": "v"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"currentStep": "next"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(5).unwrap();
        let result = client
            .call(
                Method::POST,
                &format!("{}/step", server.uri()),
                Some(&json!({"k": "v"})),
            )
            .await
            .unwrap();

        assert_eq!(result.body.current_step(), Some("next"));
    }

    #[tokio::test]
    async fn transport_failure_is_distinct_from_bad_status() {
        let client = ServiceClient::new(1).unwrap();
        // nothing listens on port 9; connection must fail at transport level
        let err = client
            .call(Method::GET, "http://127.0.0.1:9/", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Transport { .. }));
    }

    #[tokio::test]
    async fn upload_reports_non_2xx_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/slot"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(5).unwrap();
        let result = client
            .upload_binary(&format!("{}/slot", server.uri()), vec![1, 2, 3])
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, 403);
    }
}
