//! # Base64 Helpers
//!
//! HashBack uses two alphabets: standard padded base64 for `Unus` values and
//! published verification hashes, and URL-safe unpadded base64 for JWT
//! segments.
//!
//! Decoding of 256-bit values is lenient about non-zero trailing bits in
//! the final character, matching how the reference implementations decode.
//! The length and alphabet are still enforced.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Length in characters of a padded base64 rendering of 32 bytes.
pub const BASE64_256_LEN: usize = 44;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Encode bytes as standard padded base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode bytes as URL-safe base64 without padding, as used in JWT segments.
pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe unpadded base64.
pub fn from_base64url(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(text)
}

/// Decode standard padded base64.
pub fn from_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    LENIENT_STANDARD.decode(text)
}

/// Decode a 44-character standard base64 string into exactly 32 bytes.
///
/// Returns `None` for any other length, any invalid character, or any
/// payload that does not decode to 256 bits.
pub fn decode_256_bits(text: &str) -> Option<[u8; 32]> {
    if text.len() != BASE64_256_LEN {
        return None;
    }
    let bytes = LENIENT_STANDARD.decode(text).ok()?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_real_unus() {
        let bytes = decode_256_bits("iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=").unwrap();
        assert_eq!(to_base64(&bytes), "iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=");
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(decode_256_bits("iZ5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w").is_none());
        assert!(decode_256_bits("").is_none());
    }

    #[test]
    fn non_base64_is_rejected() {
        assert!(decode_256_bits("!Z5kWQaBRd3EaMtJpC4AS40JzfFgSepLpvPxMTAbt6w=").is_none());
    }

    #[test]
    fn shorter_payload_padded_to_44_is_rejected() {
        // 31 bytes encodes to 44 characters with two padding characters.
        let short = to_base64(&[7u8; 31]);
        assert_eq!(short.len(), 44);
        assert!(decode_256_bits(&short).is_none());
    }

    #[test]
    fn trailing_bits_are_tolerated() {
        let text = format!("{}=", "H".repeat(43));
        assert!(decode_256_bits(&text).is_some());
    }

    #[test]
    fn base64url_has_no_padding() {
        assert_eq!(to_base64url(&[0xfb, 0xff]), "-_8");
        assert_eq!(from_base64url("-_8").unwrap(), vec![0xfb, 0xff]);
    }
}
