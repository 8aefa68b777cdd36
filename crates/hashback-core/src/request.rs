//! # Verification Request
//!
//! The Caller's request, its protocol version, and the response type it
//! asks for.
//!
//! ## Wire shape
//!
//! ```json
//! {
//!   "HashBack": "HASHBACK-PUBLIC-DRAFT-3-1",
//!   "TypeOfResponse": "BearerToken",
//!   "IssuerUrl": "https://issuer.example/api/generate_bearer_token",
//!   "Now": 529297200,
//!   "Unus": "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=",
//!   "Rounds": 1,
//!   "VerifyUrl": "https://caller.example/hashback_files/my_json_hash.txt"
//! }
//! ```
//!
//! Every property is required. The version tag is read and checked first
//! because it decides how the rest of the request is interpreted.

use serde::Serialize;
use serde_json::Value;

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, RequestError};

/// JSON property names. Both supported drafts share the same names.
pub mod keys {
    /// Version tag property.
    pub const VERSION: &str = "HashBack";
    /// Requested response type property.
    pub const TYPE_OF_RESPONSE: &str = "TypeOfResponse";
    /// Issuer URL property.
    pub const ISSUER_URL: &str = "IssuerUrl";
    /// Unix timestamp property.
    pub const NOW: &str = "Now";
    /// 256-bit nonce property.
    pub const UNUS: &str = "Unus";
    /// PBKDF2 iteration count property.
    pub const ROUNDS: &str = "Rounds";
    /// Published-hash location property.
    pub const VERIFY_URL: &str = "VerifyUrl";
}

/// Fixed salt for draft 3.0: 64 ASCII capital letters.
const SALT_3_0: &[u8] = b"BECOLRZAMVFWECYGJTLURIDPAYBGMSCQFDXTUYNPMZOAFEDGCKXTJUZLEQFCKXYB";

/// Fixed salt for draft 3.1.
///
/// PBKDF2-HMAC-SHA512 of password `To my Treacle.` with salt
/// `I love you to the moon and back.`, 477708 iterations, 32 bytes.
const SALT_3_1: [u8; 32] = [
    113, 218, 98, 9, 6, 165, 151, 157, 46, 28, 229, 16, 66, 91, 91, 72, 150, 246, 69, 83, 216, 235,
    21, 239, 162, 229, 139, 163, 6, 73, 175, 201,
];

/// A supported HashBack protocol version.
///
/// Each version pins its own salt. Selecting the wrong salt for a version is
/// a correctness bug, which is why the salt is reachable only through the
/// version value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProtocolVersion {
    /// `HASHBACK-PUBLIC-DRAFT-3-0`.
    #[serde(rename = "HASHBACK-PUBLIC-DRAFT-3-0")]
    Draft3_0,
    /// `HASHBACK-PUBLIC-DRAFT-3-1`.
    #[serde(rename = "HASHBACK-PUBLIC-DRAFT-3-1")]
    Draft3_1,
}

impl ProtocolVersion {
    /// All versions accepted by this implementation, oldest first.
    pub const ALL: [ProtocolVersion; 2] = [Self::Draft3_0, Self::Draft3_1];

    /// The version tag as it appears on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Draft3_0 => "HASHBACK-PUBLIC-DRAFT-3-0",
            Self::Draft3_1 => "HASHBACK-PUBLIC-DRAFT-3-1",
        }
    }

    /// Look up a version by its wire tag. Matching is exact.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag() == tag)
    }

    /// Every accepted wire tag, for advertising in rejections.
    pub fn accepted_tags() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.tag()).collect()
    }

    /// The fixed PBKDF2 salt for this version. Never transmitted.
    pub fn salt(self) -> &'static [u8] {
        match self {
            Self::Draft3_0 => SALT_3_0,
            Self::Draft3_1 => &SALT_3_1,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The shape of a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// JSON object carrying the token and its timestamps.
    BearerToken,
    /// The bare token as a JSON string.
    Jwt,
    /// An empty 204 response with the token in a cookie.
    SetCookie,
}

impl ResponseType {
    /// Wire names advertised to Callers.
    pub const ACCEPTED: [&'static str; 3] = ["BearerToken", "JWT", "204SetCookie"];

    /// Parse a wire name. The legacy spelling `SetCookie` is still accepted.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "BearerToken" => Some(Self::BearerToken),
            "JWT" => Some(Self::Jwt),
            "204SetCookie" | "SetCookie" => Some(Self::SetCookie),
            _ => None,
        }
    }

    /// The canonical wire name.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::BearerToken => "BearerToken",
            Self::Jwt => "JWT",
            Self::SetCookie => "204SetCookie",
        }
    }
}

/// A parsed Caller request. Immutable once constructed.
///
/// `type_of_response` keeps the exact string the Caller sent: it is part of
/// the hashed payload, and its validity is an Issuer policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRequest {
    /// Protocol version, already known to be supported.
    #[serde(rename = "HashBack")]
    pub version: ProtocolVersion,
    /// Requested response type, as sent.
    #[serde(rename = "TypeOfResponse")]
    pub type_of_response: String,
    /// URL of the Issuer endpoint the Caller is talking to.
    #[serde(rename = "IssuerUrl")]
    pub issuer_url: String,
    /// Caller's clock, in Unix seconds.
    #[serde(rename = "Now")]
    pub now: i64,
    /// 256-bit nonce in standard base64.
    #[serde(rename = "Unus")]
    pub unus: String,
    /// PBKDF2 iteration count.
    #[serde(rename = "Rounds")]
    pub rounds: i32,
    /// Where the Caller published the verification hash.
    #[serde(rename = "VerifyUrl")]
    pub verify_url: String,
}

impl VerificationRequest {
    /// Parse a request from a JSON value.
    ///
    /// The version is read and checked first; the remaining properties are
    /// read in wire order and the first missing or mistyped one is reported.
    /// Range checks are left to the Issuer.
    pub fn from_json(body: &Value) -> Result<Self, RequestError> {
        let obj = body.as_object().ok_or(RequestError::NotAnObject)?;

        let required = |name: &'static str| -> Result<&Value, RequestError> {
            match obj.get(name) {
                None | Some(Value::Null) => Err(RequestError::MissingField(name)),
                Some(v) => Ok(v),
            }
        };
        let string = |name: &'static str| -> Result<String, RequestError> {
            required(name)?
                .as_str()
                .map(str::to_owned)
                .ok_or(RequestError::InvalidField(name))
        };
        let integer = |name: &'static str| -> Result<i64, RequestError> {
            required(name)?.as_i64().ok_or(RequestError::InvalidField(name))
        };

        let tag = string(keys::VERSION)?;
        let version =
            ProtocolVersion::from_tag(&tag).ok_or(RequestError::UnknownVersion(tag))?;

        let type_of_response = string(keys::TYPE_OF_RESPONSE)?;
        let issuer_url = string(keys::ISSUER_URL)?;
        let now = integer(keys::NOW)?;
        let unus = string(keys::UNUS)?;
        let rounds = i32::try_from(integer(keys::ROUNDS)?)
            .map_err(|_| RequestError::InvalidField(keys::ROUNDS))?;
        let verify_url = string(keys::VERIFY_URL)?;

        Ok(Self {
            version,
            type_of_response,
            issuer_url,
            now,
            unus,
            rounds,
            verify_url,
        })
    }

    /// Parse a request from raw JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(text).map_err(|_| RequestError::NotAnObject)?;
        Self::from_json(&value)
    }

    /// The canonical bytes both parties hash.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// The requested response type, if it is one of the accepted kinds.
    pub fn response_type(&self) -> Option<ResponseType> {
        ResponseType::from_wire(&self.type_of_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example() -> Value {
        json!({
            "HashBack": "HASHBACK-PUBLIC-DRAFT-3-0",
            "TypeOfResponse": "BearerToken",
            "IssuerUrl": "https://issuer.example/api/generate_bearer_token",
            "Now": 529297200,
            "Unus": "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=",
            "Rounds": 1,
            "VerifyUrl": "https://caller.example/hashback_files/my_json_hash.txt"
        })
    }

    #[test]
    fn parses_a_complete_request() {
        let req = VerificationRequest::from_json(&example()).unwrap();
        assert_eq!(req.version, ProtocolVersion::Draft3_0);
        assert_eq!(req.now, 529297200);
        assert_eq!(req.rounds, 1);
        assert_eq!(req.response_type(), Some(ResponseType::BearerToken));
    }

    #[test]
    fn canonical_form_is_key_sorted() {
        let req = VerificationRequest::from_json(&example()).unwrap();
        assert_eq!(
            req.canonical_bytes().unwrap().as_str(),
            "{\"HashBack\":\"HASHBACK-PUBLIC-DRAFT-3-0\",\
             \"IssuerUrl\":\"https://issuer.example/api/generate_bearer_token\",\
             \"Now\":529297200,\
             \"Rounds\":1,\
             \"TypeOfResponse\":\"BearerToken\",\
             \"Unus\":\"iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=\",\
             \"VerifyUrl\":\"https://caller.example/hashback_files/my_json_hash.txt\"}"
        );
    }

    #[test]
    fn each_missing_property_is_named() {
        for key in [
            keys::VERSION,
            keys::TYPE_OF_RESPONSE,
            keys::ISSUER_URL,
            keys::NOW,
            keys::UNUS,
            keys::ROUNDS,
            keys::VERIFY_URL,
        ] {
            let mut body = example();
            body.as_object_mut().unwrap().remove(key);
            assert_eq!(
                VerificationRequest::from_json(&body).unwrap_err(),
                RequestError::MissingField(key),
                "removing {key}"
            );
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut body = example();
        body["Unus"] = Value::Null;
        assert_eq!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::MissingField("Unus")
        );
    }

    #[test]
    fn version_is_checked_before_other_fields() {
        let body = json!({"HashBack": "HASHBACK-PUBLIC-DRAFT-9-9"});
        assert!(matches!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::UnknownVersion(tag) if tag == "HASHBACK-PUBLIC-DRAFT-9-9"
        ));
    }

    #[test]
    fn only_version_supplied_reports_next_field() {
        let body = json!({"HashBack": "HASHBACK-PUBLIC-DRAFT-3-1"});
        assert_eq!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::MissingField("TypeOfResponse")
        );
    }

    #[test]
    fn wrong_types_are_invalid_not_missing() {
        let mut body = example();
        body["Now"] = json!("529297200");
        assert_eq!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::InvalidField("Now")
        );

        let mut body = example();
        body["Rounds"] = json!(1.0);
        assert_eq!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::InvalidField("Rounds")
        );
    }

    #[test]
    fn rounds_beyond_i32_is_invalid() {
        let mut body = example();
        body["Rounds"] = json!(i64::from(i32::MAX) + 1);
        assert_eq!(
            VerificationRequest::from_json(&body).unwrap_err(),
            RequestError::InvalidField("Rounds")
        );
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(
            VerificationRequest::from_json(&json!([1, 2])).unwrap_err(),
            RequestError::NotAnObject
        );
        assert_eq!(
            VerificationRequest::from_json_str("not json").unwrap_err(),
            RequestError::NotAnObject
        );
    }

    #[test]
    fn response_type_names() {
        assert_eq!(ResponseType::from_wire("JWT"), Some(ResponseType::Jwt));
        assert_eq!(ResponseType::from_wire("204SetCookie"), Some(ResponseType::SetCookie));
        assert_eq!(ResponseType::from_wire("SetCookie"), Some(ResponseType::SetCookie));
        assert_eq!(ResponseType::from_wire("jwt"), None);
        assert_eq!(ResponseType::SetCookie.as_wire(), "204SetCookie");
    }

    #[test]
    fn legacy_response_type_is_hashed_as_sent() {
        let mut body = example();
        body["TypeOfResponse"] = json!("SetCookie");
        let req = VerificationRequest::from_json(&body).unwrap();
        assert!(req.canonical_bytes().unwrap().as_str().contains("\"SetCookie\""));
    }

    #[test]
    fn versions_have_distinct_salts() {
        assert_ne!(
            ProtocolVersion::Draft3_0.salt(),
            ProtocolVersion::Draft3_1.salt()
        );
        assert_eq!(ProtocolVersion::Draft3_0.salt().len(), 64);
        assert_eq!(ProtocolVersion::Draft3_1.salt().len(), 32);
    }

    #[test]
    fn version_tags_round_trip() {
        for v in ProtocolVersion::ALL {
            assert_eq!(ProtocolVersion::from_tag(v.tag()), Some(v));
        }
        assert_eq!(ProtocolVersion::from_tag("hashback-public-draft-3-0"), None);
    }
}
