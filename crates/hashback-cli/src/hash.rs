//! # Hash Subcommand
//!
//! Reads a request JSON document and prints the verification hash a Caller
//! must publish for it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hashback_core::VerificationRequest;
use hashback_crypto::VerificationHash;

/// Arguments for `hashback hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Request JSON file, or `-` for standard input.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute the hash subcommand.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let text = crate::read_input(&args.file)?;
    let hash = hash_request_text(&text)?;
    println!("{}", hash.to_base64());
    Ok(0)
}

/// Parse `text` as a request and compute its verification hash.
pub fn hash_request_text(text: &str) -> Result<VerificationHash> {
    let request = VerificationRequest::from_json_str(text).context("not a valid HashBack request")?;
    tracing::debug!(version = %request.version, rounds = request.rounds, "hashing request");
    VerificationHash::compute(&request).context("could not compute verification hash")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproduces_the_published_vector() {
        let text = r#"{
            "HashBack": "HASHBACK-PUBLIC-DRAFT-3-0",
            "TypeOfResponse": "BearerToken",
            "IssuerUrl": "https://issuer.example/api/generate_bearer_token",
            "Now": 529297200,
            "Unus": "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=",
            "Rounds": 1,
            "VerifyUrl": "https://caller.example/hashback_files/my_json_hash.txt"
        }"#;
        assert_eq!(
            hash_request_text(text).unwrap().to_base64(),
            "2pFPaBO1bf6B7O8t9mCX8XZqU8rPtxcEYRU4eurPJEU="
        );
    }

    #[test]
    fn unknown_version_is_an_error() {
        let err = hash_request_text(r#"{"HashBack": "HASHBACK-PUBLIC-DRAFT-2-0"}"#).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown HashBack version"));
    }
}
