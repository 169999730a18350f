//! Wire encodings for shares and record values

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

/// Encoding used for shares handed out by the generation ceremony
pub fn encode_share(share: &[u8]) -> String {
    STANDARD_NO_PAD.encode(share)
}

/// Decode a share in any common base64 alphabet, padded or not.
///
/// Query strings turn `+` into a space, so spaces are read back as `+`.
pub fn decode_share(part: &str) -> Option<Vec<u8>> {
    let part = part.trim_end_matches(['\r', '\n']).replace(' ', "+");
    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(&part).ok())
        .filter(|share| !share.is_empty())
}

/// Raw bytes of a record value as submitted by a client
pub fn decode_value(value: &str, is_base64: bool) -> Result<Vec<u8>, base64::DecodeError> {
    if is_base64 {
        STANDARD.decode(value)
    } else {
        Ok(value.as_bytes().to_vec())
    }
}

/// Render a record value, as UTF-8 when possible and base64 otherwise.
///
/// Returns the rendered value and whether it is base64.
pub fn encode_value(value: Vec<u8>) -> (String, bool) {
    match String::from_utf8(value) {
        Ok(text) => (text, false),
        Err(e) => (STANDARD.encode(e.as_bytes()), true),
    }
}
