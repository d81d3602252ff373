//! # Profiles CLI
//!
//! Lists the circuit profiles in effect: the built-in set overlaid with
//! any `--config` file.

use anyhow::Result;
use clap::Args;

use zkmail_core::ProfileRegistry;

/// Arguments for `zkmail profiles`.
#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Print as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Execute the profiles subcommand.
pub fn run_profiles(args: &ProfilesArgs, registry: &ProfileRegistry) -> Result<u8> {
    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = registry
            .iter()
            .map(|(name, p)| serde_json::to_value(p).map(|v| (name.to_string(), v)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(0);
    }

    println!(
        "{:<20} {:>8} {:>8} {:>5} {:>5}  {}",
        "PROFILE", "HEADERS", "BODY", "FROM", "TO", "COMMITMENT"
    );
    for (name, p) in registry.iter() {
        println!(
            "{:<20} {:>8} {:>8} {:>5} {:>5}  {}",
            name,
            p.max_headers_length,
            p.max_body_length,
            p.extract_from,
            p.extract_to,
            p.commitment_mode
        );
    }
    Ok(0)
}
