//! # hashback-cli: Command-Line Tool for HashBack
//!
//! Provides the `hashback` command for exercising the protocol by hand.
//!
//! ## Subcommands
//!
//! - `hashback hash`: verification hash of a request document.
//! - `hashback request`: build a fresh Caller request and its hash.
//! - `hashback fetch`: fetch a VerifyUrl the way an Issuer would.
//! - `hashback token`: mint a token signed with the demo key.
//!
//! ```bash
//! hashback request --issuer-url https://issuer.example/issuer \
//!     --verify-url https://caller.example/hashback/1.txt
//! hashback hash request.json
//! hashback fetch https://caller.example/hashback/1.txt
//! ```

pub mod fetch;
pub mod hash;
pub mod request;
pub mod token;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a whole input file, where `-` means standard input.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
