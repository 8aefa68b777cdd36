//! # Fetch Subcommand
//!
//! Retrieves a VerifyUrl with the same client the Issuer uses and reports
//! what it saw, so a Caller can check their published hash before sending
//! a request.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use url::Url;

use hashback_core::encoding::to_base64;
use hashback_fetch::{FetchClient, FetchConfig, FetchedArtifact, HashFetcher};

/// Arguments for `hashback fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// URL serving the verification hash.
    #[arg(value_name = "URL")]
    pub url: Url,

    /// Overall deadline in seconds.
    #[arg(long, default_value_t = 15)]
    pub deadline: u64,
}

/// Execute the fetch subcommand.
pub fn run_fetch(args: &FetchArgs) -> Result<u8> {
    let client = FetchClient::new().with_config(FetchConfig {
        deadline: Duration::from_secs(args.deadline),
        ..FetchConfig::default()
    });
    let artifact = client
        .fetch(&args.url)
        .with_context(|| format!("failed to fetch {}", args.url))?;
    print!("{}", report(&artifact));
    Ok(0)
}

/// Human-readable summary of a fetch.
pub fn report(artifact: &FetchedArtifact) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Address:     {}", artifact.address);
    match &artifact.certificate {
        Some(cert) => {
            let _ = writeln!(out, "Certificate: {} bytes", cert.len());
        }
        None => {
            let _ = writeln!(out, "Certificate: none");
        }
    }
    let _ = writeln!(out, "Status:      {}", artifact.status);
    for (name, value) in &artifact.headers {
        let _ = writeln!(out, "  {name}: {value}");
    }
    let _ = writeln!(out, "Hash:        {}", to_base64(&artifact.hash));
    out
}
