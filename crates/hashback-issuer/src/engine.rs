//! # Exchange Engine
//!
//! ## Check order
//!
//! | # | Check                         | Rejection message                                     |
//! |---|-------------------------------|-------------------------------------------------------|
//! | 0 | JSON shape                    | `Request is missing required … property.` etc.        |
//! | 1 | version                       | `Unknown HashBack version. …` + `AcceptVersions`      |
//! | 2 | response type                 | `Request's TypeOfResponse is not acceptable.`         |
//! | 3 | issuer origin                 | `IssuerUrl is for a different issuer.`                |
//! | 4 | clock skew (strict)           | `Request's Now is too far from the server's clock. …` |
//! | 5 | nonce                         | `Request's Unus is not valid.`                        |
//! | 6 | rounds                        | `Selected Rounds is out of range …` + `AcceptRounds`  |
//! | 7 | VerifyUrl rules               | see [`crate::url_policy`]                             |
//! | 8 | fetch                         | the fetcher's own message                             |
//! | 9 | compare                       | `Verification Hash did not match expected hash.`      |
//!
//! The server clock is read once per exchange; the same reading drives the
//! skew check and the token's `iat`.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use hashback_core::encoding::decode_256_bits;
use hashback_core::{Clock, ProtocolVersion, RequestError, ResponseType, VerificationRequest};
use hashback_crypto::{TokenClaims, TokenSigner, VerificationHash};
use hashback_fetch::HashFetcher;

use crate::outcome::{Advisory, ExchangeResponse, ExchangeStage, IssuedToken, Rejection};
use crate::policy::IssuerPolicy;
use crate::url_policy::check_verify_url;

/// Runs verification exchanges for one Issuer.
pub struct ExchangeEngine {
    policy: IssuerPolicy,
    fetcher: Arc<dyn HashFetcher>,
    clock: Arc<dyn Clock>,
    signer: TokenSigner,
}

impl std::fmt::Debug for ExchangeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("policy", &self.policy)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl ExchangeEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(
        policy: IssuerPolicy,
        fetcher: Arc<dyn HashFetcher>,
        clock: Arc<dyn Clock>,
        signer: TokenSigner,
    ) -> Self {
        Self {
            policy,
            fetcher,
            clock,
            signer,
        }
    }

    /// This engine's policy.
    pub fn policy(&self) -> &IssuerPolicy {
        &self.policy
    }

    /// Whether tokens are signed with the published demo key.
    pub fn uses_demo_key(&self) -> bool {
        self.signer.is_demo()
    }

    /// Run an exchange for a raw JSON body.
    pub fn handle_json(&self, body: &Value) -> Result<ExchangeResponse, Rejection> {
        let request = VerificationRequest::from_json(body).map_err(|e| {
            let rejection = match e {
                RequestError::UnknownVersion(_) => Rejection::new(ExchangeStage::VersionChecked, e.to_string())
                    .with_advisory(Advisory::Versions(ProtocolVersion::accepted_tags())),
                _ => Rejection::new(ExchangeStage::Parsed, e.to_string()),
            };
            self.rejected(rejection)
        })?;
        self.handle(&request)
    }

    /// Run an exchange for an already parsed request.
    pub fn handle(&self, request: &VerificationRequest) -> Result<ExchangeResponse, Rejection> {
        tracing::debug!(stage = %ExchangeStage::Parsed, verify_url = %request.verify_url, "exchange started");
        tracing::debug!(stage = %ExchangeStage::VersionChecked, version = %request.version, "version accepted");

        let server_now = self.clock.now_unix();
        let (kind, verify_url) = self
            .check_policy(request, server_now)
            .map_err(|r| self.rejected(r))?;
        tracing::debug!(stage = %ExchangeStage::PolicyChecked, response_type = kind.as_wire(), "policy checks passed");

        let artifact = self.fetcher.fetch(&verify_url).map_err(|e| {
            self.rejected(Rejection::new(ExchangeStage::HashFetched, e.to_string()))
        })?;
        tracing::debug!(stage = %ExchangeStage::HashFetched, address = %artifact.address, "verification hash fetched");

        let expected = VerificationHash::compute(request).map_err(|e| {
            tracing::error!(error = %e, "could not compute expected verification hash");
            self.rejected(Rejection::new(
                ExchangeStage::Compared,
                "Verification Hash could not be computed.",
            ))
        })?;
        if !expected.matches(&VerificationHash::from_bytes(artifact.hash)) {
            return Err(self.rejected(Rejection::new(
                ExchangeStage::Compared,
                "Verification Hash did not match expected hash.",
            )));
        }
        tracing::debug!(stage = %ExchangeStage::Compared, "verification hash matched");

        let token = self.issue(&verify_url, server_now);
        tracing::info!(
            stage = %ExchangeStage::Issued,
            issuer = self.policy.root_host(),
            subject = verify_url.host_str().unwrap_or_default(),
            expires_at = token.expires_at,
            response_type = kind.as_wire(),
            "token issued"
        );
        Ok(ExchangeResponse::shaped(kind, token))
    }

    fn check_policy(
        &self,
        request: &VerificationRequest,
        server_now: i64,
    ) -> Result<(ResponseType, Url), Rejection> {
        let reject = |message: String| Rejection::new(ExchangeStage::PolicyChecked, message);

        let kind = request.response_type().ok_or_else(|| {
            reject("Request's TypeOfResponse is not acceptable.".into())
                .with_advisory(Advisory::TypesOfResponse(ResponseType::ACCEPTED.to_vec()))
        })?;

        let same_issuer = Url::parse(&request.issuer_url)
            .map(|u| self.policy.is_same_origin(&u))
            .unwrap_or(false);
        if !same_issuer {
            return Err(reject("IssuerUrl is for a different issuer.".into()));
        }

        if !self.policy.is_close(request.now, server_now) {
            return Err(reject(format!(
                "Request's Now is too far from the server's clock. (Server time is {server_now}.)"
            )));
        }

        if decode_256_bits(&request.unus).is_none() {
            return Err(reject("Request's Unus is not valid.".into()));
        }

        let (min, max) = (*self.policy.rounds().start(), *self.policy.rounds().end());
        let nearest = if request.rounds < min {
            Some(min)
        } else if request.rounds > max {
            Some(max)
        } else {
            None
        };
        if let Some(nearest) = nearest {
            return Err(reject(format!("Selected Rounds is out of range {min}-{max}."))
                .with_advisory(Advisory::Rounds(nearest)));
        }

        let verify_url = check_verify_url(&request.verify_url, &self.policy)
            .map_err(|violation| reject(violation.to_string()))?;

        Ok((kind, verify_url))
    }

    fn issue(&self, verify_url: &Url, issued_at: i64) -> IssuedToken {
        let expires_at = issued_at + self.policy.token_lifespan_secs();
        let jwt = self.signer.sign(&TokenClaims {
            issuer: self.policy.root_host().to_owned(),
            subject: verify_url.host_str().unwrap_or_default().to_owned(),
            issued_at,
            expires_at,
        });
        IssuedToken {
            jwt,
            issued_at,
            expires_at,
        }
    }

    fn rejected(&self, rejection: Rejection) -> Rejection {
        tracing::warn!(
            incident_id = %rejection.incident_id_text(),
            stage = %rejection.stage,
            reason = %rejection.message,
            "verification request rejected"
        );
        rejection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashback_core::ManualClock;
    use hashback_fetch::{FetchError, FetchedArtifact};
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000;
    const UNUS: &str = "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=";

    /// Serves a fixed hash, or fails with `NoSuchHost`, and counts calls.
    struct StubFetcher {
        hash: Option<[u8; 32]>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn serving(hash: Option<[u8; 32]>) -> Arc<Self> {
            Arc::new(Self {
                hash,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl HashFetcher for StubFetcher {
        fn fetch(&self, url: &Url) -> Result<FetchedArtifact, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hash = self
                .hash
                .ok_or_else(|| FetchError::NoSuchHost(url.host_str().unwrap_or_default().to_owned()))?;
            Ok(FetchedArtifact {
                address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
                certificate: None,
                status: 200,
                headers: vec![("Content-Type".into(), "text/plain".into())],
                body: String::new(),
                hash,
            })
        }
    }

    fn request_json() -> Value {
        json!({
            "HashBack": "HASHBACK-PUBLIC-DRAFT-3-1",
            "TypeOfResponse": "BearerToken",
            "IssuerUrl": "https://issuer.example/issuer",
            "Now": NOW,
            "Unus": UNUS,
            "Rounds": 1,
            "VerifyUrl": "https://caller.example/hashback/1.txt",
        })
    }

    fn published_hash(body: &Value) -> [u8; 32] {
        let request = VerificationRequest::from_json(body).unwrap();
        *VerificationHash::compute(&request).unwrap().as_bytes()
    }

    fn engine_with(fetcher: Arc<StubFetcher>) -> ExchangeEngine {
        ExchangeEngine::new(
            IssuerPolicy::new("https://issuer.example").unwrap(),
            fetcher,
            Arc::new(ManualClock::fixed(NOW)),
            TokenSigner::demo().unwrap(),
        )
    }

    /// An engine whose fetcher publishes the correct hash for `body`.
    fn honest_engine(body: &Value) -> (ExchangeEngine, Arc<StubFetcher>) {
        let fetcher = StubFetcher::serving(Some(published_hash(body)));
        (engine_with(Arc::clone(&fetcher)), fetcher)
    }

    /// Rejection for a body that fails before the fetch; nothing is published.
    fn rejection_for(body: Value) -> (Rejection, usize) {
        let fetcher = StubFetcher::serving(None);
        let engine = engine_with(Arc::clone(&fetcher));
        let rejection = engine.handle_json(&body).unwrap_err();
        (rejection, fetcher.calls.load(Ordering::SeqCst))
    }

    #[test]
    fn valid_request_issues_a_bearer_token() {
        let body = request_json();
        let (engine, fetcher) = honest_engine(&body);

        let response = engine.handle_json(&body).unwrap();
        assert!(matches!(response, ExchangeResponse::BearerToken(_)));
        let token = response.token();
        assert_eq!(token.issued_at, NOW);
        assert_eq!(token.expires_at - token.issued_at, 3600);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let expected = TokenSigner::demo().unwrap().sign(&TokenClaims {
            issuer: "issuer.example".into(),
            subject: "caller.example".into(),
            issued_at: NOW,
            expires_at: NOW + 3600,
        });
        assert_eq!(token.jwt, expected);
    }

    #[test]
    fn response_type_selects_the_shape() {
        for (wire, check) in [
            ("JWT", ResponseType::Jwt),
            ("204SetCookie", ResponseType::SetCookie),
            ("SetCookie", ResponseType::SetCookie),
        ] {
            let mut body = request_json();
            body["TypeOfResponse"] = json!(wire);
            let (engine, _) = honest_engine(&body);
            assert_eq!(engine.handle_json(&body).unwrap().response_type(), check, "{wire}");
        }
    }

    #[test]
    fn unknown_version_advertises_supported_versions() {
        let mut body = request_json();
        body["HashBack"] = json!("HASHBACK-PUBLIC-DRAFT-2-0");
        let (r, calls) = rejection_for(body);
        assert_eq!(r.stage, ExchangeStage::VersionChecked);
        assert_eq!(
            r.advisory,
            Some(Advisory::Versions(vec![
                "HASHBACK-PUBLIC-DRAFT-3-0",
                "HASHBACK-PUBLIC-DRAFT-3-1"
            ]))
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn missing_property_is_named() {
        let mut body = request_json();
        body.as_object_mut().unwrap().remove("Unus");
        let (r, _) = rejection_for(body);
        assert_eq!(r.message, "Request is missing required Unus property.");
        assert_eq!(r.stage, ExchangeStage::Parsed);
    }

    #[test]
    fn unknown_response_type_lists_accepted_types() {
        let mut body = request_json();
        body["TypeOfResponse"] = json!("Carrier Pigeon");
        let (r, _) = rejection_for(body);
        assert_eq!(r.message, "Request's TypeOfResponse is not acceptable.");
        assert_eq!(
            r.advisory,
            Some(Advisory::TypesOfResponse(vec!["BearerToken", "JWT", "204SetCookie"]))
        );
    }

    #[test]
    fn other_issuer_is_rejected() {
        for url in ["https://elsewhere.example/issuer", "http://issuer.example/issuer", "nonsense"] {
            let mut body = request_json();
            body["IssuerUrl"] = json!(url);
            let (r, calls) = rejection_for(body);
            assert_eq!(r.message, "IssuerUrl is for a different issuer.", "{url}");
            assert_eq!(calls, 0);
        }
    }

    #[test]
    fn clock_skew_boundary_is_strict() {
        for (offset, accepted) in [(99, true), (-99, true), (100, false), (-100, false)] {
            let mut body = request_json();
            body["Now"] = json!(NOW + offset);
            let (engine, _) = honest_engine(&body);
            let result = engine.handle_json(&body);
            assert_eq!(result.is_ok(), accepted, "offset {offset}");
            if let Err(r) = result {
                assert_eq!(
                    r.message,
                    format!("Request's Now is too far from the server's clock. (Server time is {NOW}.)")
                );
            }
        }
    }

    #[test]
    fn malformed_unus_is_rejected() {
        for unus in ["", "AAAA", "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w", "!Z5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w="] {
            let mut body = request_json();
            body["Unus"] = json!(unus);
            let (r, _) = rejection_for(body);
            assert_eq!(r.message, "Request's Unus is not valid.", "{unus:?}");
        }
    }

    #[test]
    fn rounds_out_of_range_advises_nearest_bound() {
        for (rounds, nearest) in [(0, 1), (-5, 1), (10, 9), (1_000, 9)] {
            let mut body = request_json();
            body["Rounds"] = json!(rounds);
            let (r, calls) = rejection_for(body);
            assert_eq!(r.message, "Selected Rounds is out of range 1-9.");
            assert_eq!(r.advisory, Some(Advisory::Rounds(nearest)));
            assert_eq!(calls, 0);
        }
    }

    #[test]
    fn first_failing_check_wins() {
        let mut body = request_json();
        body["Unus"] = json!("short");
        body["Rounds"] = json!(50);
        body["VerifyUrl"] = json!("http://caller.example/x");
        let (r, _) = rejection_for(body);
        assert_eq!(r.message, "Request's Unus is not valid.");
    }

    #[test]
    fn verify_url_rules_apply_before_fetch() {
        let mut body = request_json();
        body["VerifyUrl"] = json!("http://caller.example/hashback/1.txt");
        let (r, calls) = rejection_for(body);
        assert_eq!(r.message, "VerifyUrl is not HTTPS.");
        assert_eq!(calls, 0);
    }

    #[test]
    fn fetch_failure_message_is_passed_through() {
        let engine = engine_with(StubFetcher::serving(None));
        let r = engine.handle_json(&request_json()).unwrap_err();
        assert_eq!(r.message, "No such host at caller.example.");
        assert_eq!(r.stage, ExchangeStage::HashFetched);
    }

    #[test]
    fn mismatched_hash_is_rejected() {
        let engine = engine_with(StubFetcher::serving(Some([0u8; 32])));
        let r = engine.handle_json(&request_json()).unwrap_err();
        assert_eq!(r.message, "Verification Hash did not match expected hash.");
        assert_eq!(r.stage, ExchangeStage::Compared);
    }

    #[test]
    fn hash_for_other_version_does_not_match() {
        let mut published_for = request_json();
        published_for["HashBack"] = json!("HASHBACK-PUBLIC-DRAFT-3-0");
        let engine = engine_with(StubFetcher::serving(Some(published_hash(&published_for))));
        let r = engine.handle_json(&request_json()).unwrap_err();
        assert_eq!(r.message, "Verification Hash did not match expected hash.");
    }

    #[test]
    fn configured_rounds_range_is_reported() {
        let mut body = request_json();
        body["Rounds"] = json!(100);
        let engine = ExchangeEngine::new(
            IssuerPolicy::new("https://issuer.example").unwrap().with_rounds(1, 99).unwrap(),
            StubFetcher::serving(None),
            Arc::new(ManualClock::fixed(NOW)),
            TokenSigner::demo().unwrap(),
        );
        let r = engine.handle_json(&body).unwrap_err();
        assert_eq!(r.message, "Selected Rounds is out of range 1-99.");
        assert_eq!(r.advisory, Some(Advisory::Rounds(99)));
    }
}
