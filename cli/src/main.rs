// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # nildid
//!
//! Entry point for the `nildid` binary. Parses CLI arguments, initializes
//! logging and runs one command:
//!
//! - `derive`: derive a keypair and print its JSON record
//! - `verify`: check a stored record against the source account
//! - `inspect`: print every intermediate value of a derivation
//! - `did`: decode a `did:nil` string
//! - `version`: print build version information
//!
//! Results go to stdout, logs to stderr.

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;

use nildid_protocol::auth::AuthMessage;
use nildid_protocol::crypto::keys::SourceKey;
use nildid_protocol::derivation::{derive_traced, derive_with_config};
use nildid_protocol::identity::NilDid;
use nildid_protocol::record::{verify_stored_with_config, StoredKeypair};

use cli::{Commands, MessageArgs, NilDidCli, SourceArgs};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = NilDidCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Derive(args) => run_derive(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Did(args) => run_did(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn load_source(args: &SourceArgs) -> Result<SourceKey> {
    SourceKey::from_hex(&args.source_key).context("failed to parse source key")
}

fn load_message(args: &MessageArgs) -> Result<AuthMessage> {
    AuthMessage::new(&args.key_id, &args.context).context("invalid authorization message")
}

/// Derives the keypair and emits the stored record.
fn run_derive(args: cli::DeriveArgs) -> Result<()> {
    let source = load_source(&args.source)?;
    let message = load_message(&args.message)?;

    let derived = derive_with_config(&source, &message, &args.source.app_secret, &args.source.config())
        .context("derivation failed")?;
    tracing::info!(did = %derived.did, address = %derived.ethereum_address, "derived keypair");

    let json = StoredKeypair::from(&derived).to_json()?;
    write_output(args.output.as_deref(), &json)
}

/// Loads a record and re-derives it. A mismatch is an error so the process
/// exits non-zero.
fn run_verify(args: cli::VerifyArgs) -> Result<()> {
    let source = load_source(&args.source)?;

    let json = std::fs::read_to_string(&args.record)
        .with_context(|| format!("failed to read record: {}", args.record.display()))?;
    let record = StoredKeypair::from_json(&json)
        .with_context(|| format!("failed to parse record: {}", args.record.display()))?;

    let matches = verify_stored_with_config(&record, &source, &args.source.app_secret, &args.source.config())
        .context("record is malformed")?;

    if !matches {
        bail!("record {} does not match the source account", record.did);
    }
    println!("ok {}", record.did);
    Ok(())
}

/// Prints the derivation trace as pretty JSON.
fn run_inspect(args: cli::InspectArgs) -> Result<()> {
    let source = load_source(&args.source)?;
    let message = load_message(&args.message)?;

    let (_, trace) = derive_traced(&source, &message, &args.source.app_secret, &args.source.config())
        .context("derivation failed")?;
    println!("{}", serde_json::to_string_pretty(&trace)?);
    Ok(())
}

fn run_did(args: cli::DidArgs) -> Result<()> {
    let did = NilDid::parse(&args.did).context("invalid did:nil")?;

    let out = serde_json::json!({
        "did": did.to_string(),
        "public_key_compressed": hex::encode(did.public_key_compressed()),
        "public_key_uncompressed": hex::encode(did.public_key_uncompressed()?),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "record written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn print_version() {
    println!("nildid {}", env!("CARGO_PKG_VERSION"));
    println!(
        "domain {} {}",
        nildid_protocol::config::EIP712_DOMAIN_NAME,
        nildid_protocol::config::EIP712_DOMAIN_VERSION
    );
    println!("rustc  {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
