//! The verification workflow orchestrator.
//!
//! Drives the remote service through its ordered step sequence for one
//! session: personal info, SSO skip, upload slot, document upload, upload
//! completion, then a bounded status poll. Steps are strictly sequential;
//! a failure in the personal-info, upload-slot or upload steps aborts the
//! run, while the SSO skip and upload completion are logged but tolerated.
//! Every run returns a structured [`WorkflowOutcome`] plus its full
//! chronological log — aborts are converted, never panicked on.

use crate::client::{ServiceClient, StepResult};
use crate::config::VerifyConfig;
use crate::error::{failure_message, WorkflowError};
use crate::fingerprint;
use crate::model::{LogEntry, RunLog, VerificationSession, WorkflowOutcome};
use rand::Rng;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

/// Consent string submitted with the personal-info metadata block.
const SUBMISSION_OPT_IN: &str = "By submitting the personal information above, I acknowledge that \
     my personal information is being collected under the privacy policy of the business from \
     which I am seeking a discount";

/// Feature-flag blob the service expects alongside the personal info.
const COLLECT_FLAGS: &str = r#"{"collect-info-step-email-first":"default","doc-upload-considerations":"default","doc-upload-may24":"default","doc-upload-redesign-use-legacy-message-keys":false,"docUpload-assertion-checklist":"default","font-size":"default","include-cvec-field-france-student":"not-labeled-optional"}"#;

/// Extract a verification id from a service entry URL.
pub fn parse_verification_id(url: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)verificationId=([a-f0-9]+)").ok()?;
    re.captures(url).map(|c| c[1].to_string())
}

/// Completed (or aborted) run: terminal outcome plus the ordered log.
#[derive(Debug)]
pub struct WorkflowRun {
    pub outcome: WorkflowOutcome,
    pub log: Vec<LogEntry>,
}

/// Orchestrator for one verification session at a time.
///
/// Holds only the immutable config reference and an HTTP client; concurrent
/// runs are independent.
#[derive(Debug)]
pub struct VerificationWorkflow<'a> {
    config: &'a VerifyConfig,
    client: ServiceClient,
}

impl<'a> VerificationWorkflow<'a> {
    pub fn new(config: &'a VerifyConfig) -> Result<Self, WorkflowError> {
        Ok(Self {
            client: ServiceClient::new(config.timeout_secs)?,
            config,
        })
    }

    /// Run the full step sequence for one session.
    ///
    /// Never fails: any abort is converted into a failure outcome, with the
    /// failure reason appended to the log first.
    pub async fn run(&self, session: &VerificationSession) -> WorkflowRun {
        let mut log = RunLog::new();
        let outcome = match self.drive(session, &mut log).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log.error(format!("aborted: {err}"));
                WorkflowOutcome::failure(&session.verification_id, outcome_message(&err))
            }
        };
        WorkflowRun {
            outcome,
            log: log.into_entries(),
        }
    }

    async fn drive(
        &self,
        session: &VerificationSession,
        log: &mut RunLog,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let fingerprint = fingerprint::device_fingerprint();

        log.info(format!(
            "starting verification for {} {}",
            session.first_name, session.last_name
        ));
        log.debug(format!("email: {}", session.email));
        log.debug(format!("birth date: {}", session.birth_date));
        log.debug(format!("verification id: {}", session.verification_id));
        log.debug(format!("device fingerprint: {fingerprint}"));

        self.submit_personal_info(session, &fingerprint, log).await?;
        self.pace(self.config.pacing.after_personal_info_ms).await;
        self.skip_sso(session, log).await?;
        self.pace(self.config.pacing.after_sso_ms).await;
        let upload_url = self.request_upload_slot(session, log).await?;
        self.upload_document(session, &upload_url, log).await?;
        self.complete_upload(session, log).await?;
        self.poll_status(session, log).await
    }

    /// Step 1: POST the session's personal data to the collect-info endpoint.
    async fn submit_personal_info(
        &self,
        session: &VerificationSession,
        fingerprint: &str,
        log: &mut RunLog,
    ) -> Result<(), WorkflowError> {
        log.info("step 1/6: submitting personal info");

        let body = json!({
            "firstName": session.first_name,
            "lastName": session.last_name,
            "birthDate": session.birth_date,
            "email": session.email,
            "phoneNumber": "",
            "organization": {
                "id": self.config.organization.id,
                "idExtended": self.config.organization.id_extended,
                "name": self.config.organization.name,
            },
            "deviceFingerprintHash": fingerprint,
            "locale": self.config.locale,
            "metadata": {
                "marketConsentValue": false,
                "refererUrl": self.config.referer_url(&session.verification_id),
                "verificationId": session.verification_id,
                "flags": COLLECT_FLAGS,
                "submissionOptIn": SUBMISSION_OPT_IN,
            },
        });

        let url = self
            .config
            .step_url(&session.verification_id, "collectStudentPersonalInfo");
        let result = self.client.call(Method::POST, &url, Some(&body)).await?;

        if result.status != 200 || result.body.current_step() == Some("error") {
            let err = step_failure("personal info submission", &result);
            log.error(format!("personal info rejected: {}", result.body.snippet()));
            return Err(err);
        }

        log.success(format!(
            "personal info accepted, current step: {}",
            result.body.current_step().unwrap_or("unknown")
        ));
        Ok(())
    }

    /// Step 2: DELETE the SSO step. Logged, never fatal.
    async fn skip_sso(
        &self,
        session: &VerificationSession,
        log: &mut RunLog,
    ) -> Result<(), WorkflowError> {
        log.info("step 2/6: skipping SSO");

        let url = self.config.step_url(&session.verification_id, "sso");
        let result = self.client.call(Method::DELETE, &url, None).await?;

        match result.body.current_step() {
            Some(step) => log.success(format!("SSO step cleared, current step: {step}")),
            None => log.warning(format!("SSO skip returned status {}", result.status)),
        }
        Ok(())
    }

    /// Step 3: request an upload slot; returns the issued upload URL.
    async fn request_upload_slot(
        &self,
        session: &VerificationSession,
        log: &mut RunLog,
    ) -> Result<String, WorkflowError> {
        log.info("step 3/6: requesting document upload slot");

        let body = json!({
            "files": [{
                "fileName": self.config.document_file_name,
                "mimeType": "image/png",
                "fileSize": session.document.len(),
            }],
        });
        log.debug(format!("document size: {} bytes", session.document.len()));

        let url = self.config.step_url(&session.verification_id, "docUpload");
        let result = self.client.call(Method::POST, &url, Some(&body)).await?;
        log.debug(format!("upload slot response status: {}", result.status));

        if result.status != 200 {
            let err = step_failure("upload slot request", &result);
            log.error(format!("upload slot refused: {}", result.body.snippet()));
            return Err(err);
        }

        // absence of an upload URL is reported separately from a bad status
        let upload_url = result
            .body
            .as_json()
            .and_then(|j| j.get("documents"))
            .and_then(Value::as_array)
            .and_then(|docs| docs.first())
            .and_then(|doc| doc.get("uploadUrl"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match upload_url {
            Some(upload_url) => {
                log.success("upload URL issued");
                Ok(upload_url)
            }
            None => {
                log.error(format!(
                    "upload slot response carried no upload URL: {}",
                    result.body.snippet()
                ));
                Err(WorkflowError::structural(
                    "no upload URL in the document upload response",
                ))
            }
        }
    }

    /// Step 4: PUT the document bytes to the issued upload URL.
    async fn upload_document(
        &self,
        session: &VerificationSession,
        upload_url: &str,
        log: &mut RunLog,
    ) -> Result<(), WorkflowError> {
        log.info("step 4/6: uploading document");

        let result = self
            .client
            .upload_binary(upload_url, session.document.clone())
            .await?;

        if !result.success {
            log.error(format!("document upload failed with status {}", result.status));
            return Err(WorkflowError::Upload {
                status: result.status,
            });
        }

        log.success("document uploaded");
        Ok(())
    }

    /// Step 5: finalize the upload. Logged, non-200 tolerated.
    async fn complete_upload(
        &self,
        session: &VerificationSession,
        log: &mut RunLog,
    ) -> Result<(), WorkflowError> {
        log.info("step 5/6: completing document upload");

        let url = self
            .config
            .step_url(&session.verification_id, "completeDocUpload");
        let result = self.client.call(Method::POST, &url, None).await?;

        if result.status == 200 {
            log.success(format!(
                "document upload completed, current step: {}",
                result.body.current_step().unwrap_or("unknown")
            ));
        } else {
            log.warning(format!(
                "complete-upload returned status {}",
                result.status
            ));
        }
        Ok(())
    }

    /// Step 6: poll the verification resource until a terminal step or the
    /// attempt budget runs out. Waits one interval before every check.
    async fn poll_status(
        &self,
        session: &VerificationSession,
        log: &mut RunLog,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        log.info("step 6/6: polling verification status");

        let url = self.config.status_poll_url(&session.verification_id);
        let max_attempts = self.config.poll.max_attempts;
        let interval = Duration::from_millis(self.config.poll.interval_ms);
        let mut final_status: Option<Value> = None;

        for attempt in 1..=max_attempts {
            sleep(interval).await;

            let result = self.client.call(Method::GET, &url, None).await?;
            let step = result.body.current_step().map(str::to_string);
            final_status = result.body.as_json().cloned();

            log.debug(format!(
                "status check {attempt}/{max_attempts}: {}",
                step.as_deref().unwrap_or("unknown")
            ));

            match step.as_deref() {
                Some("success") => {
                    let redirect_url = final_status
                        .as_ref()
                        .and_then(|v| v.get("redirectUrl"))
                        .and_then(Value::as_str)
                        .map(String::from);
                    log.success("verification succeeded");
                    if let Some(target) = &redirect_url {
                        log.info(format!("redirect URL: {target}"));
                    }
                    return Ok(WorkflowOutcome {
                        success: true,
                        message: "verification succeeded".to_string(),
                        verification_id: session.verification_id.clone(),
                        redirect_url,
                        final_status,
                    });
                }
                Some("rejected") => {
                    log.error("verification rejected");
                    return Ok(WorkflowOutcome {
                        final_status,
                        ..WorkflowOutcome::failure(
                            &session.verification_id,
                            "verification rejected",
                        )
                    });
                }
                Some("error") => {
                    let message = final_status
                        .as_ref()
                        .map(failure_message)
                        .unwrap_or_else(|| "verification failed".to_string());
                    log.error(format!("verification ended in error: {message}"));
                    return Ok(WorkflowOutcome {
                        final_status,
                        ..WorkflowOutcome::failure(&session.verification_id, message)
                    });
                }
                _ => {}
            }
        }

        let message = format!("verification timed out after {max_attempts} status checks");
        log.warning(message.clone());
        Ok(WorkflowOutcome {
            final_status,
            ..WorkflowOutcome::failure(&session.verification_id, message)
        })
    }

    /// Randomized pause between early steps. Disabled via config; drawn
    /// uniformly from the configured `[min, max]` millisecond range.
    async fn pace(&self, (min, max): (u64, u64)) {
        if !self.config.pacing.enabled || max == 0 {
            return;
        }
        let ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        sleep(Duration::from_millis(ms)).await;
    }
}

/// Failure for a step that returned a bad status or an error-marked body.
fn step_failure(step: &'static str, result: &StepResult) -> WorkflowError {
    let message = match result.body.as_json() {
        Some(json) => failure_message(json),
        None => format!("unexpected status {}", result.status),
    };
    WorkflowError::step(step, Some(result.status), message)
}

/// Message surfaced to the caller for an aborted run.
fn outcome_message(err: &WorkflowError) -> String {
    match err {
        WorkflowError::Step { message, .. } => message.clone(),
        WorkflowError::Structural { message } => message.clone(),
        _ => err.to_string(),
    }
}
