//! # CLI Interface
//!
//! Defines the command-line argument structure for `nildid` using `clap`
//! derive. Five subcommands: `derive`, `verify`, `inspect`, `did` and
//! `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use nildid_protocol::config::{
    DerivationConfig, DEFAULT_APP_SECRET, DEFAULT_MAX_ATTEMPTS, EIP712_DOMAIN_NAME,
    EIP712_DOMAIN_VERSION,
};

/// Deterministic did:nil keypairs from Ethereum accounts.
///
/// Signs an EIP-712 authorization with the source key, runs the signature
/// through HKDF-SHA256 and turns the result into a secp256k1 keypair and a
/// `did:nil` identifier.
#[derive(Parser, Debug)]
#[command(name = "nildid", about = "Derive and verify did:nil keypairs", version, propagate_version = true)]
pub struct NilDidCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "NILDID_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "nildid=info,nildid_protocol=info")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive a keypair and print it as a JSON record.
    Derive(DeriveArgs),
    /// Re-derive from a stored record and check that it matches.
    Verify(VerifyArgs),
    /// Print every intermediate value of a derivation.
    Inspect(InspectArgs),
    /// Decode a did:nil string into its public keys.
    Did(DidArgs),
    /// Print version information and exit.
    Version,
}

/// The source account and derivation parameters shared by every command
/// that runs the pipeline.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Hex-encoded secp256k1 private key of the source account (optional
    /// `0x` prefix).
    ///
    /// **Prefer the environment variable** over the flag; flags end up in
    /// shell history.
    #[arg(long, env = "NILDID_SOURCE_KEY", hide_env_values = true)]
    pub source_key: String,

    /// Application secret mixed into the key material.
    #[arg(long, env = "NILDID_APP_SECRET", hide_env_values = true, default_value = DEFAULT_APP_SECRET)]
    pub app_secret: String,

    /// Upper bound on curve-validity checks.
    #[arg(long, env = "NILDID_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// EIP-712 domain name.
    #[arg(long, default_value = EIP712_DOMAIN_NAME)]
    pub domain_name: String,

    /// EIP-712 domain version.
    #[arg(long, default_value = EIP712_DOMAIN_VERSION)]
    pub domain_version: String,
}

impl SourceArgs {
    pub fn config(&self) -> DerivationConfig {
        DerivationConfig::default()
            .with_domain(&self.domain_name, &self.domain_version)
            .with_max_attempts(self.max_attempts)
    }
}

/// The authorization message fields.
#[derive(Args, Debug)]
pub struct MessageArgs {
    /// Key identifier within the context.
    #[arg(long, env = "NILDID_KEY_ID")]
    pub key_id: String,

    /// Application context the key is bound to.
    #[arg(long, env = "NILDID_CONTEXT", default_value = "nillion")]
    pub context: String,
}

/// Arguments for the `derive` subcommand.
#[derive(Args, Debug)]
pub struct DeriveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub message: MessageArgs,

    /// Write the record to this file instead of stdout. The file contains
    /// the derived private key.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the `verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to a JSON record produced by `derive`.
    pub record: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub message: MessageArgs,
}

/// Arguments for the `did` subcommand.
#[derive(Args, Debug)]
pub struct DidArgs {
    /// The `did:nil:...` string to decode.
    pub did: String,
}
