//! # Digest CLI
//!
//! ```bash
//! zkmail digest me@example.com
//! zkmail digest --decimal denemedeneme581
//! ```

use anyhow::Result;
use clap::Args;

use zkmail_core::weighted_digest_str;

/// Arguments for `zkmail digest`.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Text to digest, as UTF-8.
    pub text: String,

    /// Print the digest in decimal instead of hex.
    #[arg(long)]
    pub decimal: bool,
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let digest = weighted_digest_str(&args.text);
    if args.decimal {
        println!("{}", digest.as_biguint());
    } else {
        println!("{}", digest.to_hex());
    }
    Ok(0)
}
