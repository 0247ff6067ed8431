//! Exit codes shared by every subcommand.

pub const SUCCESS: i32 = 0;
pub const VERIFICATION_FAILED: i32 = 1; // the run completed but did not verify
pub const CONFIG_ERROR: i32 = 2; // bad arguments, unreadable files, missing config
