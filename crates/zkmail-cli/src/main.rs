//! # zkmail CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zkmail_cli::digest::{run_digest, DigestArgs};
use zkmail_cli::extract::{run_extract, ExtractArgs};
use zkmail_cli::inputs::{run_inputs, InputsArgs};
use zkmail_cli::load_profiles;
use zkmail_cli::profiles::{run_profiles, ProfilesArgs};
use zkmail_cli::prove::{run_prove, ProveArgs};

/// zkmail: zero-knowledge proofs about DKIM-signed email.
///
/// Assembles circuit inputs from signed messages, committing to the
/// recipient address and username by digest, and drives proving and
/// verification.
#[derive(Parser, Debug)]
#[command(name = "zkmail", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// YAML file of circuit profiles to add to the built-in set.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Weighted digest of a string, as committed by the circuit.
    Digest(DigestArgs),

    /// List circuit profiles.
    Profiles(ProfilesArgs),

    /// Extract the username a message is addressed to.
    Extract(ExtractArgs),

    /// Assemble circuit inputs for a message and print them as JSON.
    Inputs(InputsArgs),

    /// Assemble inputs, prove, and verify with the reference engine.
    Prove(ProveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = load_profiles(cli.config.as_deref()).and_then(|registry| match &cli.command {
        Commands::Digest(args) => run_digest(args),
        Commands::Profiles(args) => run_profiles(args, &registry),
        Commands::Extract(args) => run_extract(args),
        Commands::Inputs(args) => run_inputs(args, &registry),
        Commands::Prove(args) => run_prove(args, &registry),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmail_zkp::{BackendId, BackendSelection};

    #[test]
    fn parse_digest() {
        let cli = Cli::try_parse_from(["zkmail", "digest", "abc"]).unwrap();
        if let Commands::Digest(args) = cli.command {
            assert_eq!(args.text, "abc");
            assert!(!args.decimal);
        } else {
            panic!("expected digest");
        }
    }

    #[test]
    fn parse_inputs_defaults_profile() {
        let cli = Cli::try_parse_from([
            "zkmail", "inputs", "--eml", "m.eml", "--to", "a@b.c", "--keys", "k.yaml",
        ])
        .unwrap();
        if let Commands::Inputs(args) = cli.command {
            assert_eq!(args.assemble.profile, "instagram");
            assert!(args.assemble.username.is_none());
            assert_eq!(args.assemble.eml, PathBuf::from("m.eml"));
        } else {
            panic!("expected inputs");
        }
    }

    #[test]
    fn parse_prove_backend_all() {
        let cli = Cli::try_parse_from([
            "zkmail", "-vv", "prove", "--eml", "m.eml", "--to", "a@b.c", "--keys", "k.yaml",
            "--circuit", "c.json", "--backend", "all", "--username", "someone",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.log_json);
        if let Commands::Prove(args) = cli.command {
            assert_eq!(args.backend, BackendSelection::All);
            assert_eq!(args.assemble.username.as_deref(), Some("someone"));
        } else {
            panic!("expected prove");
        }
    }

    #[test]
    fn parse_prove_defaults_to_honk() {
        let cli = Cli::try_parse_from([
            "zkmail", "prove", "--eml", "m.eml", "--to", "a@b.c", "--keys", "k.yaml",
            "--circuit", "c.json",
        ])
        .unwrap();
        if let Commands::Prove(args) = cli.command {
            assert_eq!(args.backend, BackendSelection::Single(BackendId::Honk));
            assert!(args.deadline_secs.is_none());
        } else {
            panic!("expected prove");
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from([
            "zkmail", "prove", "--eml", "m.eml", "--to", "a@b.c", "--keys", "k.yaml",
            "--circuit", "c.json", "--backend", "groth16",
        ])
        .is_err());
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["zkmail", "profiles", "--config", "p.yaml", "--json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("p.yaml")));

        let cli = Cli::try_parse_from(["zkmail", "digest", "x", "--log-json"]).unwrap();
        assert!(cli.log_json);
    }

    #[test]
    fn inputs_requires_to_and_keys() {
        assert!(Cli::try_parse_from(["zkmail", "inputs", "--eml", "m.eml"]).is_err());
    }
}
