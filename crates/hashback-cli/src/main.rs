//! # hashback CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hashback_cli::fetch::{run_fetch, FetchArgs};
use hashback_cli::hash::{run_hash, HashArgs};
use hashback_cli::request::{run_request, RequestArgs};
use hashback_cli::token::{run_token, TokenArgs};

/// HashBack protocol toolkit
///
/// Builds and hashes Caller requests, probes VerifyUrls the way an Issuer
/// fetches them, and mints demo tokens.
#[derive(Parser, Debug)]
#[command(name = "hashback", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the verification hash of a request document.
    Hash(HashArgs),

    /// Build a fresh request and the hash to publish for it.
    Request(RequestArgs),

    /// Fetch a VerifyUrl and report the hash it serves.
    Fetch(FetchArgs),

    /// Mint a token signed with the demo key.
    Token(TokenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Hash(args) => run_hash(&args),
        Commands::Request(args) => run_request(&args),
        Commands::Fetch(args) => run_fetch(&args),
        Commands::Token(args) => run_token(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
