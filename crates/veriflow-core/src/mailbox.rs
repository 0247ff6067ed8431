//! Mailbox scan for verification emails.
//!
//! One IMAP session over implicit TLS, expressed as awaited stages:
//! connect, login, select INBOX, search, fetch-and-parse each match, logout.
//! The connection is logged out on every exit path. A message that fails to
//! parse is skipped; it never aborts the scan of the others.
//!
//! Link extraction is an explicit, narrow heuristic (not general HTML
//! parsing): URLs containing the service's domain token, de-duplicated,
//! preferring paths that mention `verify`, `confirmation` or `click`, with
//! the first three links as the fallback.

use crate::config::MailboxConfig;
use crate::error::ScanError;
use crate::model::{EmailRecord, EmailScanResult};
use chrono::Utc;
use futures::TryStreamExt;
use mail_parser::MessageParser;
use regex::Regex;
use tokio::net::TcpStream;
use tracing::{debug, warn};

type ImapSession = async_imap::Session<async_native_tls::TlsStream<TcpStream>>;

/// Keywords that mark a link as a verification link.
const PREFERRED_PATH_TOKENS: [&str; 3] = ["verify", "confirmation", "click"];

/// Links kept when no preferred link is found.
const FALLBACK_LINK_COUNT: usize = 3;

/// Scanner over a configured mailbox. Stateless between scans.
#[derive(Debug)]
pub struct MailboxScanner<'a> {
    config: &'a MailboxConfig,
}

impl<'a> MailboxScanner<'a> {
    pub fn new(config: &'a MailboxConfig) -> Self {
        Self { config }
    }

    /// Scan the inbox for verification emails received in the last
    /// `since_minutes` minutes.
    pub async fn scan(&self, since_minutes: u32) -> Result<EmailScanResult, ScanError> {
        let cfg = self.config;

        let tcp = TcpStream::connect((cfg.host.as_str(), cfg.port))
            .await
            .map_err(|e| ScanError::Connect {
                message: e.to_string(),
            })?;
        let tls = async_native_tls::TlsConnector::new();
        let tls_stream = tls
            .connect(cfg.host.as_str(), tcp)
            .await
            .map_err(|e| ScanError::Connect {
                message: e.to_string(),
            })?;

        let client = async_imap::Client::new(tls_stream);
        let mut session = client
            .login(&cfg.username, &cfg.password)
            .await
            .map_err(|(e, _)| ScanError::Login {
                message: e.to_string(),
            })?;

        // the session must be released on every exit path, including
        // search or fetch failure
        let result = self.scan_session(&mut session, since_minutes).await;
        if let Err(e) = session.logout().await {
            debug!(error = %e, "mailbox logout failed");
        }
        result
    }

    async fn scan_session(
        &self,
        session: &mut ImapSession,
        since_minutes: u32,
    ) -> Result<EmailScanResult, ScanError> {
        let cfg = self.config;

        session
            .select("INBOX")
            .await
            .map_err(|e| ScanError::Session {
                stage: "select",
                message: e.to_string(),
            })?;

        let since = Utc::now() - chrono::Duration::minutes(i64::from(since_minutes));
        let query = format!(
            r#"SINCE {} FROM "{}""#,
            since.format("%d-%b-%Y"),
            cfg.sender_token
        );
        debug!(query = %query, "mailbox search");

        let mut seqs: Vec<u32> = session
            .search(&query)
            .await
            .map_err(|e| ScanError::Session {
                stage: "search",
                message: e.to_string(),
            })?
            .into_iter()
            .collect();
        seqs.sort_unstable();

        if seqs.is_empty() {
            return Ok(EmailScanResult {
                found: false,
                emails: Vec::new(),
            });
        }

        let set = seqs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let messages: Vec<async_imap::types::Fetch> = {
            let stream = session
                .fetch(&set, "RFC822")
                .await
                .map_err(|e| ScanError::Session {
                    stage: "fetch",
                    message: e.to_string(),
                })?;
            stream.try_collect().await.map_err(|e| ScanError::Session {
                stage: "fetch",
                message: e.to_string(),
            })?
        };

        let mut emails = Vec::new();
        for message in &messages {
            let Some(raw) = message.body() else {
                continue;
            };
            match parse_message(raw, &cfg.sender_token, &cfg.link_domain) {
                Some(record) => emails.push(record),
                None => warn!("skipping unparseable or non-matching message"),
            }
        }

        Ok(EmailScanResult {
            found: !emails.is_empty(),
            emails,
        })
    }
}

/// Parse one raw message into a scan record.
///
/// Returns `None` for unparseable messages and for messages whose From
/// field does not contain the sender token (the server-side search already
/// filters, this pins the case-insensitive substring rule).
fn parse_message(raw: &[u8], sender_token: &str, link_domain: &str) -> Option<EmailRecord> {
    let message = MessageParser::default().parse(raw)?;

    let from = message
        .from()
        .and_then(|a| a.first())
        .map(|addr| {
            match (addr.name.as_deref(), addr.address.as_deref()) {
                (Some(name), Some(address)) => format!("{name} <{address}>"),
                (None, Some(address)) => address.to_string(),
                (Some(name), None) => name.to_string(),
                (None, None) => String::new(),
            }
        })
        .unwrap_or_default();

    if !from.to_lowercase().contains(&sender_token.to_lowercase()) {
        return None;
    }

    let mut bodies = Vec::new();
    if let Some(html) = message.body_html(0) {
        bodies.push(html.to_string());
    }
    if let Some(text) = message.body_text(0) {
        bodies.push(text.to_string());
    }

    let links = select_links(extract_links(&bodies, link_domain));

    Some(EmailRecord {
        subject: message.subject().unwrap_or_default().to_string(),
        from,
        date: message
            .date()
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
        links,
    })
}

/// All URLs containing the domain token, in order of first occurrence,
/// de-duplicated across bodies.
fn extract_links(bodies: &[String], link_domain: &str) -> Vec<String> {
    let pattern = format!(
        r#"https?://[^\s"'<>\\]*{}[^\s"'<>\\]*"#,
        regex::escape(link_domain)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for body in bodies {
        for m in re.find_iter(body) {
            let link = m.as_str().to_string();
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    links
}

/// Prefer links whose path mentions a verification keyword; otherwise keep
/// the first three de-duplicated links.
fn select_links(links: Vec<String>) -> Vec<String> {
    let preferred: Vec<String> = links
        .iter()
        .filter(|link| {
            let path = url::Url::parse(link)
                .map(|u| u.path().to_lowercase())
                .unwrap_or_else(|_| link.to_lowercase());
            PREFERRED_PATH_TOKENS.iter().any(|t| path.contains(t))
        })
        .cloned()
        .collect();

    if preferred.is_empty() {
        links.into_iter().take(FALLBACK_LINK_COUNT).collect()
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preferred_link_wins_over_other_links() {
        let links = strings(&[
            "https://cdn.sheerid.com/assets/logo.png",
            "https://my.sheerid.com/verify/abc123/",
        ]);
        assert_eq!(
            select_links(links),
            vec!["https://my.sheerid.com/verify/abc123/".to_string()]
        );
    }

    #[test]
    fn fallback_keeps_first_three_links() {
        let links = strings(&[
            "https://a.sheerid.com/1",
            "https://a.sheerid.com/2",
            "https://a.sheerid.com/3",
            "https://a.sheerid.com/4",
        ]);
        assert_eq!(select_links(links).len(), 3);
    }

    #[test]
    fn extraction_is_domain_constrained_and_deduplicated() {
        let body = "visit https://my.sheerid.com/verify/x twice: \
                    https://my.sheerid.com/verify/x and also https://example.com/verify/y"
            .to_string();
        let links = extract_links(&[body], "sheerid.com");
        assert_eq!(links, vec!["https://my.sheerid.com/verify/x".to_string()]);
    }

    #[test]
    fn extraction_spans_html_and_text_bodies() {
        let html = r#"<a href="https://my.sheerid.com/confirmation/1">go</a>"#.to_string();
        let text = "plain copy: https://my.sheerid.com/confirmation/2".to_string();
        let links = extract_links(&[html, text], "sheerid.com");
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn parse_message_extracts_fields_and_preferred_link() {
        let raw = b"From: SheerID <noreply@sheerid.com>\r\n\
            To: student@example.edu\r\n\
            Subject: Verify your status\r\n\
            Date: Mon, 24 Aug 2026 10:00:00 +0000\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            Click https://my.sheerid.com/verify/abc123/ to continue.\r\n\
            Logo: https://cdn.sheerid.com/logo.png\r\n";

        let record = parse_message(raw, "sheerid", "sheerid.com").unwrap();
        assert_eq!(record.subject, "Verify your status");
        assert!(record.from.contains("noreply@sheerid.com"));
        assert_eq!(record.links, vec!["https://my.sheerid.com/verify/abc123/"]);
    }

    #[test]
    fn parse_message_rejects_other_senders() {
        let raw = b"From: Shop <deals@example.com>\r\n\
            Subject: sale\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            https://my.sheerid.com/verify/abc\r\n";
        assert!(parse_message(raw, "sheerid", "sheerid.com").is_none());
    }

    #[test]
    fn unparseable_message_yields_none() {
        assert!(parse_message(&[0xff, 0xfe, 0x00], "sheerid", "sheerid.com").is_none());
    }
}
