//! Route-level tests driven through the router without a live listener.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use veriflow_core::{PacingConfig, PollConfig, VerifyConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "----veriflowtestboundary";
const VERIFICATION_ID: &str = "64a0f1c2d3e4f5a6b7c8d9e0";

fn test_config(base_url: &str) -> VerifyConfig {
    VerifyConfig {
        service_url: base_url.to_string(),
        status_url: base_url.to_string(),
        poll: PollConfig {
            max_attempts: 2,
            interval_ms: 5,
        },
        pacing: PacingConfig {
            enabled: false,
            ..PacingConfig::default()
        },
        ..VerifyConfig::default()
    }
}

/// Multipart form with every text field except those in `omit`.
fn form_body(omit: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [
        ("verificationId", VERIFICATION_ID),
        ("firstName", "Ada"),
        ("lastName", "Lovelace"),
        ("email", "ada@example.edu"),
        ("birthDate", "2002-04-01"),
    ] {
        if omit.contains(&name) {
            continue;
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"studentCard\"; \
             filename=\"card.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[0x89, b'P', b'N', b'G', 1, 2, 3]);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = veriflow_server::router(test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn verify_without_boundary_is_rejected() {
    let app = veriflow_server::router(test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(
            Request::post("/api/verify")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("boundary"));
}

#[tokio::test]
async fn verify_with_missing_field_names_the_field() {
    let app = veriflow_server::router(test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(
            Request::post("/api/verify")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(form_body(&["firstName"])))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("firstName"));
}

#[tokio::test]
async fn verify_runs_workflow_and_returns_outcome_with_log() {
    let server = MockServer::start().await;
    let step = |name: &str| format!("/rest/v2/verification/{VERIFICATION_ID}/step/{name}");

    Mock::given(method("POST"))
        .and(path(step("collectStudentPersonalInfo")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "currentStep": "sso" })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(step("sso")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "currentStep": "docUpload" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(step("docUpload")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{ "uploadUrl": format!("{}/upload/slot-1", server.uri()) }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/slot-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(step("completeDocUpload")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/rest/v2/verification/{VERIFICATION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentStep": "success",
            "redirectUrl": "https://merchant.example.com/reward",
        })))
        .mount(&server)
        .await;

    let app = veriflow_server::router(test_config(&server.uri()));
    let response = app
        .oneshot(
            Request::post("/api/verify")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(form_body(&[])))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["verificationId"], VERIFICATION_ID);
    assert_eq!(body["redirectUrl"], "https://merchant.example.com/reward");
    assert!(!body["logs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn email_scan_route_absent_without_mailbox_config() {
    let app = veriflow_server::router(test_config("http://127.0.0.1:9"));
    let response = app
        .oneshot(Request::get("/api/emails").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
