use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "veriflow",
    version,
    about = "Drive a remote student-status verification session end to end"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full verification workflow for one session
    Verify(VerifyArgs),
    /// Scan the configured mailbox for recent verification emails
    ScanMail(ScanMailArgs),
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Verification entry URL, or a bare verification id
    pub target: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    /// Birth date, YYYY-MM-DD
    #[arg(long)]
    pub birth_date: String,

    /// Document image to upload
    #[arg(long)]
    pub document: PathBuf,

    /// Emit the outcome and log as one JSON object
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ScanMailArgs {
    /// Look-back window in minutes
    #[arg(long, default_value_t = 10)]
    pub since: u32,

    /// Emit the scan result as JSON
    #[arg(long)]
    pub json: bool,
}
