//! The OTR text layer: recognizing plaintext, query messages, and
//! `?OTR:`-encoded frames inside whatever text the transport hands the
//! dispatcher, and base64-armoring outgoing binary frames.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::ProtoError;

const ENCODED_PREFIX: &str = "?OTR:";
const ENCODED_SUFFIX: &str = ".";
const QUERY_PREFIX: &str = "?OTRv";
/// Appended to outgoing plaintext when `whitespace_start_ake` policy is on,
/// advertising v2/v3 support via the classic OTR whitespace tag.
pub const WHITESPACE_TAG_BASE: &str = "\x20\x09\x20\x20\x09\x09\x09\x09\x20\x09\x20\x09\x20\x09\x20\x20";
pub const WHITESPACE_TAG_V2: &str = "\x20\x09\x20\x09\x20\x20\x09\x20";
pub const WHITESPACE_TAG_V3: &str = "\x20\x09\x20\x09\x20\x20\x09\x09";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingText<'a> {
    /// Ordinary text, with any trailing whitespace-tag advertisement
    /// stripped and reported separately.
    Plaintext { text: &'a str, advertises_v2: bool, advertises_v3: bool },
    /// `?OTRv...?` naming the versions the sender is willing to speak.
    Query { versions: Vec<u8> },
    /// A full binary frame, already base64-decoded.
    Encoded(Vec<u8>),
}

/// Classify a line of incoming text per the three message shapes named in
/// the external interface contract.
pub fn classify(input: &str) -> Result<IncomingText<'_>, ProtoError> {
    if let Some(rest) = input.strip_prefix(ENCODED_PREFIX) {
        let body = rest
            .strip_suffix(ENCODED_SUFFIX)
            .ok_or(ProtoError::MalformedMessage("encoded message missing trailing '.'"))?;
        let bytes = STANDARD
            .decode(body)
            .map_err(|_| ProtoError::MalformedMessage("encoded message is not valid base64"))?;
        return Ok(IncomingText::Encoded(bytes));
    }

    if let Some(rest) = input.strip_prefix(QUERY_PREFIX) {
        let digits = rest
            .strip_suffix('?')
            .ok_or(ProtoError::MalformedMessage("query message missing trailing '?'"))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtoError::MalformedMessage("query message versions must be ASCII digits"));
        }
        let versions = digits.bytes().map(|b| b - b'0').collect();
        return Ok(IncomingText::Query { versions });
    }

    let advertises_v2 = input.contains(WHITESPACE_TAG_BASE) && input.contains(WHITESPACE_TAG_V2);
    let advertises_v3 = input.contains(WHITESPACE_TAG_BASE) && input.contains(WHITESPACE_TAG_V3);
    Ok(IncomingText::Plaintext { text: input, advertises_v2, advertises_v3 })
}

/// Base64-armor a binary frame into `?OTR:...base64....`
pub fn encode_frame(frame: &[u8]) -> String {
    format!("{ENCODED_PREFIX}{}{ENCODED_SUFFIX}", STANDARD.encode(frame))
}

/// Build a query message advertising the given versions, e.g. `?OTRv3?`.
pub fn encode_query(versions: &[u8]) -> String {
    let digits: String = versions.iter().map(|v| v.to_string()).collect();
    format!("{QUERY_PREFIX}{digits}?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_frame_roundtrip() {
        let frame = vec![1, 2, 3, 4, 5];
        let text = encode_frame(&frame);
        match classify(&text).unwrap() {
            IncomingText::Encoded(bytes) => assert_eq!(bytes, frame),
            other => panic!("expected Encoded, got {other:?}"),
        }
    }

    #[test]
    fn query_message_roundtrip() {
        let text = encode_query(&[2, 3]);
        assert_eq!(text, "?OTRv23?");
        match classify(&text).unwrap() {
            IncomingText::Query { versions } => assert_eq!(versions, vec![2, 3]),
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_with_no_tag() {
        match classify("hello there").unwrap() {
            IncomingText::Plaintext { text, advertises_v2, advertises_v3 } => {
                assert_eq!(text, "hello there");
                assert!(!advertises_v2);
                assert!(!advertises_v3);
            }
            other => panic!("expected Plaintext, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_with_v3_whitespace_tag() {
        let tagged = format!("hi{WHITESPACE_TAG_BASE}{WHITESPACE_TAG_V3}");
        match classify(&tagged).unwrap() {
            IncomingText::Plaintext { advertises_v3, advertises_v2, .. } => {
                assert!(advertises_v3);
                assert!(!advertises_v2);
            }
            other => panic!("expected Plaintext, got {other:?}"),
        }
    }

    #[test]
    fn malformed_query_is_rejected() {
        assert!(classify("?OTRvabc?").is_err());
    }

    #[test]
    fn encoded_message_missing_dot_is_rejected() {
        assert!(classify("?OTR:aGVsbG8").is_err());
    }
}
