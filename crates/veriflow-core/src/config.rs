//! Process-wide configuration.
//!
//! Built once at startup ([`VerifyConfig::from_env`] or deserialized) and
//! passed to each component by reference; read-only after construction.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the verification workflow and mailbox scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Step-submission host.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Status-polling host (distinct from the step-submission host).
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Verification program id, used for the referer URL.
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Organization submitted with the personal-info step.
    #[serde(default)]
    pub organization: OrganizationConfig,

    /// Locale submitted with the personal-info step.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// File name reported in the upload-slot request.
    #[serde(default = "default_document_file_name")]
    pub document_file_name: String,

    /// Request timeout in seconds for remote calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on accepted document size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Status-poll bounds.
    #[serde(default)]
    pub poll: PollConfig,

    /// Inter-step pacing pauses.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Mailbox credentials; the scan capability is disabled when absent.
    #[serde(default)]
    pub mailbox: Option<MailboxConfig>,
}

/// Fixed organization identity sent with the personal-info step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub id: u64,
    pub id_extended: String,
    pub name: String,
}

/// Bounds for the terminal-status polling loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of status checks before reporting a timeout.
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,

    /// Wait before each status check, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

/// Randomized pauses inserted between early workflow steps.
///
/// Not a correctness requirement; disable with `enabled = false` (tests do).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `[min, max]` milliseconds after the personal-info step.
    #[serde(default = "default_pace_after_personal_info")]
    pub after_personal_info_ms: (u64, u64),

    /// `[min, max]` milliseconds after the SSO skip.
    #[serde(default = "default_pace_after_sso")]
    pub after_sso_ms: (u64, u64),
}

/// Static mailbox credentials and matching tokens for the email scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    pub host: String,

    /// Implicit-TLS port.
    #[serde(default = "default_imap_port")]
    pub port: u16,

    pub username: String,
    pub password: String,

    /// Case-insensitive substring matched against the From field.
    #[serde(default = "default_sender_token")]
    pub sender_token: String,

    /// Domain token extracted links must contain.
    #[serde(default = "default_link_domain")]
    pub link_domain: String,
}

fn default_service_url() -> String {
    "https://services.sheerid.com".to_string()
}

fn default_status_url() -> String {
    "https://my.sheerid.com".to_string()
}

fn default_program_id() -> String {
    "67c8c14f5f17a83b745e3f82".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_document_file_name() -> String {
    "student_card.png".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_pace_after_personal_info() -> (u64, u64) {
    (2000, 4000)
}

fn default_pace_after_sso() -> (u64, u64) {
    (1500, 3000)
}

fn default_imap_port() -> u16 {
    993
}

fn default_sender_token() -> String {
    "sheerid".to_string()
}

fn default_link_domain() -> String {
    "sheerid.com".to_string()
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            id: 331898,
            id_extended: "331898".to_string(),
            name: "Logan University (Chesterfield, MO)".to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_poll_attempts(),
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            after_personal_info_ms: default_pace_after_personal_info(),
            after_sso_ms: default_pace_after_sso(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            status_url: default_status_url(),
            program_id: default_program_id(),
            organization: OrganizationConfig::default(),
            locale: default_locale(),
            document_file_name: default_document_file_name(),
            timeout_secs: default_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            poll: PollConfig::default(),
            pacing: PacingConfig::default(),
            mailbox: None,
        }
    }
}

impl VerifyConfig {
    /// Create config from `VERIFLOW_*` environment variables.
    ///
    /// Unset variables fall back to defaults; the mailbox section is present
    /// only when host, username and password are all set.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            service_url: env_or("VERIFLOW_SERVICE_URL", default_service_url),
            status_url: env_or("VERIFLOW_STATUS_URL", default_status_url),
            program_id: env_or("VERIFLOW_PROGRAM_ID", default_program_id),
            ..Self::default()
        };

        if let Ok(id) = std::env::var("VERIFLOW_ORG_ID") {
            if let Ok(id) = id.parse() {
                cfg.organization.id = id;
                cfg.organization.id_extended = id.to_string();
            }
        }
        if let Ok(name) = std::env::var("VERIFLOW_ORG_NAME") {
            cfg.organization.name = name;
        }
        if let Some(attempts) = parse_env("VERIFLOW_POLL_ATTEMPTS") {
            cfg.poll.max_attempts = attempts;
        }
        if let Some(interval) = parse_env("VERIFLOW_POLL_INTERVAL_MS") {
            cfg.poll.interval_ms = interval;
        }
        if let Ok(v) = std::env::var("VERIFLOW_PACING") {
            cfg.pacing.enabled = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }

        cfg.mailbox = MailboxConfig::from_env();
        cfg
    }

    /// URL for a named step of a verification session.
    pub fn step_url(&self, verification_id: &str, step: &str) -> String {
        format!(
            "{}/rest/v2/verification/{}/step/{}",
            self.service_url.trim_end_matches('/'),
            verification_id,
            step
        )
    }

    /// URL for the verification resource on the status host.
    pub fn status_poll_url(&self, verification_id: &str) -> String {
        format!(
            "{}/rest/v2/verification/{}",
            self.status_url.trim_end_matches('/'),
            verification_id
        )
    }

    /// Referer URL reported in the personal-info metadata block.
    pub fn referer_url(&self, verification_id: &str) -> String {
        format!(
            "{}/verify/{}/?verificationId={}",
            self.service_url.trim_end_matches('/'),
            self.program_id,
            verification_id
        )
    }
}

impl MailboxConfig {
    /// Mailbox section from environment; `None` unless credentials are complete.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("VERIFLOW_IMAP_HOST").ok()?;
        let username = std::env::var("VERIFLOW_IMAP_USERNAME").ok()?;
        let password = std::env::var("VERIFLOW_IMAP_PASSWORD").ok()?;
        Some(Self {
            host,
            port: parse_env("VERIFLOW_IMAP_PORT").unwrap_or_else(default_imap_port),
            username,
            password,
            sender_token: env_or("VERIFLOW_MAIL_SENDER_TOKEN", default_sender_token),
            link_domain: env_or("VERIFLOW_MAIL_LINK_DOMAIN", default_link_domain),
        })
    }
}

fn env_or(key: &str, fallback: fn() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
