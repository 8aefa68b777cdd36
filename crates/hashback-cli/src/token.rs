//! # Token Subcommand
//!
//! Mints a token signed with the published demo key, for testing services
//! that accept HashBack tokens.

use anyhow::{bail, Result};
use clap::Args;

use hashback_core::{Clock, SystemClock};
use hashback_crypto::build_signed_token;

/// Arguments for `hashback token`.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Issuer host (`iss`).
    #[arg(long)]
    pub issuer: String,

    /// Subject host (`sub`).
    #[arg(long)]
    pub subject: String,

    /// Seconds until expiry.
    #[arg(long, default_value_t = 3600)]
    pub lifespan: i64,
}

/// Execute the token subcommand.
pub fn run_token(args: &TokenArgs) -> Result<u8> {
    println!("{}", mint(args, SystemClock.now_unix())?);
    Ok(0)
}

/// Sign a demo token issued at `now`.
pub fn mint(args: &TokenArgs, now: i64) -> Result<String> {
    if args.lifespan <= 0 {
        bail!("lifespan must be positive, got {}", args.lifespan);
    }
    tracing::warn!("token is signed with the published demo key");
    Ok(build_signed_token(&args.issuer, &args.subject, now, now + args.lifespan)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashback_core::encoding::from_base64url;

    fn args(lifespan: i64) -> TokenArgs {
        TokenArgs {
            issuer: "issuer.example".into(),
            subject: "caller.example".into(),
            lifespan,
        }
    }

    #[test]
    fn token_carries_the_requested_claims() {
        let jwt = mint(&args(60), 1_700_000_000).unwrap();
        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);
        let claims: serde_json::Value =
            serde_json::from_slice(&from_base64url(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "issuer.example");
        assert_eq!(claims["sub"], "caller.example");
        assert_eq!(claims["exp"], 1_700_000_060);
    }

    #[test]
    fn lifespan_must_be_positive() {
        assert!(mint(&args(0), 1_700_000_000).is_err());
    }
}
