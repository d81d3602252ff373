//! # zkmail-cli — Command-Line Interface
//!
//! Provides the `zkmail` binary. Each subcommand lives in its own module
//! with a clap `Args` struct and a `run_*` handler returning the process
//! exit code.
//!
//! ## Subcommands
//!
//! - `zkmail digest`: weighted digest of a string.
//! - `zkmail profiles`: list the circuit profiles in effect.
//! - `zkmail extract`: derive the username embedded in a message.
//! - `zkmail inputs`: assemble the circuit inputs for a message as JSON.
//! - `zkmail prove`: assemble, prove and verify with the reference engine.
//!
//! ```bash
//! zkmail inputs --eml reset.eml --to me@example.com --keys keys.yaml
//! zkmail prove --eml reset.eml --to me@example.com --keys keys.yaml \
//!     --circuit target/instagram.json --backend all
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: success.
//! - `1`: error (bad input, I/O, infrastructure failure).
//! - `2`: the message does not satisfy the circuit (constraint violation or
//!   a proof that does not verify).

pub mod digest;
pub mod extract;
pub mod inputs;
pub mod profiles;
pub mod prove;

use std::path::Path;

use anyhow::{Context, Result};
use zkmail_core::ProfileRegistry;

/// Exit code for a message that does not satisfy the circuit.
pub const EXIT_REJECTED: u8 = 2;

/// Built-in profiles, overlaid with the profiles declared in `config`.
pub fn load_profiles(config: Option<&Path>) -> Result<ProfileRegistry> {
    let registry = ProfileRegistry::builtin();
    match config {
        Some(path) => registry
            .extend_from_file(path)
            .with_context(|| format!("failed to load profiles from {}", path.display())),
        None => Ok(registry),
    }
}

/// Read a raw message from disk.
pub fn read_message(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read message {}", path.display()))
}
