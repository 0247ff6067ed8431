//! Automation for a fixed multi-step remote identity-verification protocol.
//!
//! This crate drives a third-party "student status" verification service
//! through its documented step sequence on behalf of a single requester:
//!
//! - submit personal data for the verification session
//! - skip the optional SSO step
//! - request a document-upload slot and `PUT` the document to object storage
//! - finalize the upload and poll for a terminal outcome
//!
//! A secondary, independent capability scans a mailbox for verification
//! emails and extracts candidate links.
//!
//! # Quick Start
//!
//! ```no_run
//! use veriflow_core::{VerificationSession, VerificationWorkflow, VerifyConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = VerifyConfig::from_env();
//! let workflow = VerificationWorkflow::new(&config)?;
//!
//! let session = VerificationSession {
//!     verification_id: "64a0f1c2d3e4f5a6b7c8d9e0".into(),
//!     first_name: "Ada".into(),
//!     last_name: "Lovelace".into(),
//!     email: "ada@example.edu".into(),
//!     birth_date: "2002-04-01".into(),
//!     document: std::fs::read("card.png")?,
//! };
//!
//! let run = workflow.run(&session).await;
//! println!("{}: {}", run.outcome.success, run.outcome.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! All configuration is an immutable [`VerifyConfig`] constructed once at
//! process start and passed by reference; no component reads ambient global
//! state.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `VERIFLOW_SERVICE_URL` | Step-submission host (default: `https://services.sheerid.com`) |
//! | `VERIFLOW_STATUS_URL` | Status-polling host (default: `https://my.sheerid.com`) |
//! | `VERIFLOW_PROGRAM_ID` | Verification program id |
//! | `VERIFLOW_ORG_ID` | Organization id submitted with personal info |
//! | `VERIFLOW_ORG_NAME` | Organization display name |
//! | `VERIFLOW_POLL_ATTEMPTS` | Max status checks before timing out (default: 10) |
//! | `VERIFLOW_POLL_INTERVAL_MS` | Wait between status checks (default: 3000) |
//! | `VERIFLOW_PACING` | Set to `0`/`false` to disable inter-step pacing |
//! | `VERIFLOW_IMAP_HOST` | Mailbox host (scan disabled when unset) |
//! | `VERIFLOW_IMAP_PORT` | Mailbox port (default: 993, implicit TLS) |
//! | `VERIFLOW_IMAP_USERNAME` | Mailbox login |
//! | `VERIFLOW_IMAP_PASSWORD` | Mailbox password |
//! | `VERIFLOW_MAIL_SENDER_TOKEN` | Sender substring to match (default: `sheerid`) |
//! | `VERIFLOW_MAIL_LINK_DOMAIN` | Domain token links must contain (default: `sheerid.com`) |

pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod mailbox;
pub mod model;
pub mod multipart;
pub mod workflow;

pub use client::{ResponseBody, ServiceClient, StepResult, UploadResult};
pub use config::{MailboxConfig, OrganizationConfig, PacingConfig, PollConfig, VerifyConfig};
pub use error::{RequestError, ScanError, WorkflowError};
pub use mailbox::MailboxScanner;
pub use model::{
    EmailRecord, EmailScanResult, LogEntry, LogLevel, VerificationSession, WorkflowOutcome,
    DOCUMENT_FIELD,
};
pub use multipart::{boundary_from_content_type, decode, Part};
pub use workflow::{parse_verification_id, VerificationWorkflow, WorkflowRun};
