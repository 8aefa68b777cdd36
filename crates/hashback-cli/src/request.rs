//! # Request Subcommand
//!
//! Builds a Caller request stamped with the current time and a random
//! `Unus`, then prints it with the hash that must be published at its
//! `VerifyUrl` before the request is sent.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rand_core::{OsRng, RngCore};
use url::Url;

use hashback_core::encoding::to_base64;
use hashback_core::{Clock, ProtocolVersion, SystemClock, VerificationRequest};
use hashback_crypto::VerificationHash;

/// Protocol draft to speak.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionArg {
    #[value(name = "3.0")]
    V3_0,
    #[value(name = "3.1")]
    V3_1,
}

impl From<VersionArg> for ProtocolVersion {
    fn from(arg: VersionArg) -> Self {
        match arg {
            VersionArg::V3_0 => ProtocolVersion::Draft3_0,
            VersionArg::V3_1 => ProtocolVersion::Draft3_1,
        }
    }
}

/// Arguments for `hashback request`.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Issuer endpoint the request will be sent to.
    #[arg(long)]
    pub issuer_url: Url,

    /// Where the verification hash will be published.
    #[arg(long)]
    pub verify_url: Url,

    /// PBKDF2 rounds.
    #[arg(long, default_value_t = 1)]
    pub rounds: i32,

    /// Protocol version.
    #[arg(long, value_enum, default_value = "3.1")]
    pub version: VersionArg,

    /// Requested response type.
    #[arg(long = "type", default_value = "BearerToken")]
    pub type_of_response: String,
}

/// Execute the request subcommand.
pub fn run_request(args: &RequestArgs) -> Result<u8> {
    let mut unus = [0u8; 32];
    OsRng.fill_bytes(&mut unus);

    let request = build_request(args, SystemClock.now_unix(), &unus);
    let hash = VerificationHash::compute(&request).context("could not compute verification hash")?;

    println!("{}", serde_json::to_string_pretty(&request)?);
    println!();
    println!("Publish at {}:", request.verify_url);
    println!("{}", hash.to_base64());
    Ok(0)
}

/// Assemble a request from `args` at time `now` with nonce `unus`.
pub fn build_request(args: &RequestArgs, now: i64, unus: &[u8; 32]) -> VerificationRequest {
    VerificationRequest {
        version: args.version.into(),
        type_of_response: args.type_of_response.clone(),
        issuer_url: args.issuer_url.to_string(),
        now,
        unus: to_base64(unus),
        rounds: args.rounds,
        verify_url: args.verify_url.to_string(),
    }
}
