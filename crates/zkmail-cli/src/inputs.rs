//! # Inputs CLI
//!
//! Assembles the circuit inputs for a message and prints them as JSON.
//! The flags here are shared with `zkmail prove`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use zkmail_core::{CanonicalInputRecord, ProfileRegistry};
use zkmail_inputs::{DkimParser, InputAssembler, KeyStore, UsernameSource};

use crate::read_message;

/// Message, profile and commitment flags.
#[derive(Args, Debug, Clone)]
pub struct AssembleArgs {
    /// Path to the raw message (.eml).
    #[arg(long)]
    pub eml: PathBuf,

    /// Circuit profile name.
    #[arg(long, default_value = "instagram")]
    pub profile: String,

    /// Recipient address to commit to.
    #[arg(long)]
    pub to: String,

    /// Username to commit to. Derived from the message when omitted.
    #[arg(long)]
    pub username: Option<String>,

    /// DKIM key store (YAML).
    #[arg(long)]
    pub keys: PathBuf,

    /// Only accept a DKIM-Signature from this signing domain.
    #[arg(long)]
    pub signing_domain: Option<String>,
}

impl AssembleArgs {
    fn username_source(&self) -> UsernameSource {
        match &self.username {
            Some(name) => UsernameSource::Supplied(name.clone()),
            None => UsernameSource::DeriveFromMessage,
        }
    }

    /// Run parsing and assembly.
    pub fn assemble(&self, registry: &ProfileRegistry) -> Result<CanonicalInputRecord> {
        let keys = KeyStore::from_file(&self.keys)
            .with_context(|| format!("failed to load keys from {}", self.keys.display()))?;
        let mut parser = DkimParser::new(keys);
        if let Some(domain) = &self.signing_domain {
            parser = parser.with_signing_domain(domain.as_str());
        }
        let assembler = InputAssembler::new(registry.clone(), parser);
        let raw = read_message(&self.eml)?;
        assembler
            .assemble(&raw, &self.profile, &self.to, &self.username_source())
            .with_context(|| format!("failed to assemble inputs for {}", self.eml.display()))
    }
}

/// Arguments for `zkmail inputs`.
#[derive(Args, Debug)]
pub struct InputsArgs {
    #[command(flatten)]
    pub assemble: AssembleArgs,

    /// Write the JSON to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the inputs subcommand.
pub fn run_inputs(args: &InputsArgs, registry: &ProfileRegistry) -> Result<u8> {
    let record = args.assemble.assemble(registry)?;
    let json = serde_json::to_string_pretty(&record)?;
    write_output(args.out.as_deref(), &json)?;
    Ok(0)
}

/// Print to stdout, or write to `out` when given.
pub(crate) fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
