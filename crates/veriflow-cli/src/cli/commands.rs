use anyhow::{bail, Context};
use serde_json::json;

use veriflow_core::{
    parse_verification_id, LogLevel, MailboxScanner, VerificationSession, VerificationWorkflow,
    VerifyConfig,
};

use super::args::{Cli, Command, ScanMailArgs, VerifyArgs};
use crate::exit_codes;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Verify(args) => verify(args).await,
        Command::ScanMail(args) => scan_mail(args).await,
    }
}

/// Accept either the full entry URL or a bare verification id.
fn resolve_verification_id(target: &str) -> anyhow::Result<String> {
    if let Some(id) = parse_verification_id(target) {
        return Ok(id);
    }
    if !target.is_empty() && target.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(target.to_lowercase());
    }
    bail!("no verification id found in '{target}'");
}

async fn verify(args: VerifyArgs) -> anyhow::Result<i32> {
    let verification_id = resolve_verification_id(&args.target)?;
    let document = std::fs::read(&args.document)
        .with_context(|| format!("could not read document {}", args.document.display()))?;

    let config = VerifyConfig::from_env();
    let session = VerificationSession {
        verification_id,
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        birth_date: args.birth_date,
        document,
    };

    let workflow = VerificationWorkflow::new(&config)?;
    let run = workflow.run(&session).await;

    if args.json {
        let payload = json!({
            "outcome": run.outcome,
            "logs": run.log,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for entry in &run.log {
            println!("{} {}", level_tag(entry.level), entry.message);
        }
        println!();
        if run.outcome.success {
            println!("verified: {}", run.outcome.message);
            if let Some(url) = &run.outcome.redirect_url {
                println!("redirect: {url}");
            }
        } else {
            println!("not verified: {}", run.outcome.message);
        }
    }

    Ok(if run.outcome.success {
        exit_codes::SUCCESS
    } else {
        exit_codes::VERIFICATION_FAILED
    })
}

async fn scan_mail(args: ScanMailArgs) -> anyhow::Result<i32> {
    let config = VerifyConfig::from_env();
    let Some(mailbox) = config.mailbox.as_ref() else {
        bail!("mailbox is not configured; set the VERIFLOW_IMAP_* variables");
    };

    let scanner = MailboxScanner::new(mailbox);
    let result = scanner.scan(args.since).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.found {
        for email in &result.emails {
            println!("{} | {} | {}", email.date, email.from, email.subject);
            for link in &email.links {
                println!("  {link}");
            }
        }
    } else {
        println!("no matching emails in the last {} minutes", args.since);
    }

    Ok(if result.found {
        exit_codes::SUCCESS
    } else {
        exit_codes::VERIFICATION_FAILED
    })
}

fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "[info]",
        LogLevel::Debug => "[debug]",
        LogLevel::Success => "[ ok ]",
        LogLevel::Warning => "[warn]",
        LogLevel::Error => "[fail]",
    }
}
