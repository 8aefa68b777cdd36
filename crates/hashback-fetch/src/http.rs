//! # HTTP/1.1 Request and Response Codec
//!
//! ## Request
//!
//! Always a single `GET` with `Connection: close` and
//! `Accept-Encoding: identity`, so the response is read to EOF and never
//! compressed. Caller-supplied headers follow the fixed ones.
//!
//! ## Response
//!
//! Parsing is lenient about line endings: CR, LF and CRLF each end a line.
//! Folded header continuations (lines starting with space or tab) are joined
//! to the previous header with one space. Validation is strict: status 200,
//! `text/plain` media type, and a body line that decodes to 256 bits.

use hashback_core::encoding::decode_256_bits;
use url::Url;

use crate::error::ResponseError;

/// `User-Agent` sent with every fetch.
pub const USER_AGENT: &str =
    "HashBack Demo. Please report issues to https://github.com/billpg/HashBack/issues";

/// Serialize the `GET` request for `url`.
///
/// The `Host` header carries the port only when it differs from the
/// scheme's default.
pub fn build_request(url: &Url, extra_headers: &[(String, String)]) -> Vec<u8> {
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut host = url.host_str().unwrap_or_default().to_owned();
    if let Some(port) = url.port() {
        host.push(':');
        host.push_str(&port.to_string());
    }

    let mut out = format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Connection: close\r\n\
         Accept-Encoding: identity\r\n\
         User-Agent: {USER_AGENT}\r\n"
    );
    for (name, value) in extra_headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.into_bytes()
}

/// Splits a byte buffer into lines ended by CR, LF or CRLF.
#[derive(Debug)]
pub struct LineReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    /// Read lines from `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The next line without its terminator, or `None` at end of input.
    ///
    /// A final line with no terminator is still returned.
    pub fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.buf[start..];
        match rest.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(offset) => {
                let end = start + offset;
                self.pos = end + 1;
                if self.buf[end] == b'\r' && self.buf.get(end + 1) == Some(&b'\n') {
                    self.pos += 1;
                }
                Some(&self.buf[start..end])
            }
            None => {
                self.pos = self.buf.len();
                Some(rest)
            }
        }
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }
}

/// An HTTP response that passed verification-hash validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResponse {
    /// Status code; always 200 once validated.
    pub status: u16,
    /// Headers in arrival order, folded continuations joined.
    pub headers: Vec<(String, String)>,
    /// Body text, lossily decoded as UTF-8.
    pub body: String,
    /// The first body line that decoded to 256 bits.
    pub hash: [u8; 32],
}

impl VerificationResponse {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse the status line and return its code.
///
/// Any `HTTP/` version is accepted, not only `HTTP/1.1`: a server that
/// answers a 1.1 request as 1.0 still delivers a complete body because the
/// client reads until close.
pub fn parse_status_line(line: &[u8]) -> Result<u16, ResponseError> {
    let line = String::from_utf8_lossy(line);
    let mut parts = line.split_ascii_whitespace();
    let version = parts.next().ok_or(ResponseError::MissingStatusLine)?;
    if !version.starts_with("HTTP/") {
        return Err(ResponseError::NotHttp);
    }
    let code = parts.next().ok_or(ResponseError::MissingStatusCode)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResponseError::InvalidStatusCode);
    }
    let code: u16 = code.parse().map_err(|_| ResponseError::InvalidStatusCode)?;
    if !(100..=599).contains(&code) {
        return Err(ResponseError::InvalidStatusCode);
    }
    Ok(code)
}

/// Read header lines up to the blank line, joining folded continuations.
fn parse_headers(lines: &mut LineReader<'_>) -> Result<Vec<(String, String)>, ResponseError> {
    let mut raw: Vec<String> = Vec::new();
    while let Some(line) = lines.next_line() {
        if line.is_empty() {
            break;
        }
        let text = String::from_utf8_lossy(line);
        if text.starts_with(' ') || text.starts_with('\t') {
            let previous = raw.last_mut().ok_or(ResponseError::OrphanContinuation)?;
            let piece = text.trim();
            if !piece.is_empty() {
                previous.push(' ');
                previous.push_str(piece);
            }
        } else {
            raw.push(text.into_owned());
        }
    }

    raw.into_iter()
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or(ResponseError::HeaderWithoutColon)?;
            Ok((name.trim().to_owned(), value.trim().to_owned()))
        })
        .collect()
}

/// Parse and validate a raw response from `host` as a verification hash.
///
/// Checks run in this order: status line, status 200, headers present,
/// header syntax, `Content-Type`, body hash.
pub fn parse_verification_response(
    host: &str,
    bytes: &[u8],
) -> Result<VerificationResponse, ResponseError> {
    let mut lines = LineReader::new(bytes);

    let status_line = lines.next_line().ok_or(ResponseError::MissingStatusLine)?;
    let status = parse_status_line(status_line)?;
    if status != 200 {
        return Err(ResponseError::UnexpectedStatus {
            host: host.to_owned(),
            code: status,
        });
    }

    let headers = parse_headers(&mut lines)?;
    if headers.is_empty() {
        return Err(ResponseError::MissingHeaders(host.to_owned()));
    }

    let content_type = find_header(&headers, "Content-Type")
        .ok_or_else(|| ResponseError::MissingContentType(host.to_owned()))?;
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("text/plain") {
        return Err(ResponseError::WrongContentType {
            host: host.to_owned(),
            content_type: content_type.to_owned(),
        });
    }

    let body_bytes = lines.rest();
    let mut body_lines = LineReader::new(body_bytes);
    let hash = std::iter::from_fn(|| body_lines.next_line())
        .find_map(|line| decode_256_bits(String::from_utf8_lossy(line).trim()))
        .ok_or_else(|| ResponseError::NoHash(host.to_owned()))?;

    Ok(VerificationResponse {
        status,
        headers,
        body: String::from_utf8_lossy(body_bytes).into_owned(),
        hash,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn line_endings_never_change_the_parsed_hash(
            endings in proptest::collection::vec(prop_oneof![Just("\r"), Just("\n"), Just("\r\n")], 4),
        ) {
            // A bare CR closing the last header followed by a bare LF would read as one CRLF.
            prop_assume!(!(endings[1] == "\r" && endings[2] == "\n"));
            let parts = ["HTTP/1.1 200 OK", "Content-Type: text/plain", "", "2pFPaBO1bf6B7O8t9mCX8XZqU8rPtxcEYRU4eurPJEU="];
            let mut bytes = Vec::new();
            for (part, ending) in parts.iter().zip(&endings) {
                bytes.extend_from_slice(part.as_bytes());
                bytes.extend_from_slice(ending.as_bytes());
            }
            let parsed = parse_verification_response("h", &bytes).unwrap();
            prop_assert_eq!(
                parsed.hash,
                decode_256_bits("2pFPaBO1bf6B7O8t9mCX8XZqU8rPtxcEYRU4eurPJEU=").unwrap()
            );
        }

        #[test]
        fn parser_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = parse_verification_response("h", &bytes);
        }
    }
}
