//! # Extract CLI
//!
//! Prints the username a message is addressed to and the rule that found
//! it. No signature checks are made; the message only needs to split into
//! headers and body.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use zkmail_core::UsernameExtractor;
use zkmail_inputs::mime::decoded_text;

use crate::read_message;

/// Arguments for `zkmail extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Path to the raw message (.eml).
    pub eml: PathBuf,
}

/// Execute the extract subcommand.
pub fn run_extract(args: &ExtractArgs) -> Result<u8> {
    let raw = read_message(&args.eml)?;
    let text = decoded_text(&raw).context("message could not be split")?;
    let (username, rule) = UsernameExtractor::standard()?
        .extract_with_rule(&text)
        .context("no username found")?;
    println!("{username}\t({rule})");
    Ok(0)
}
