//! Base64url (RFC 4648 §5) codec with no padding.
//!
//! Thin wrapper over the `base64` crate's `URL_SAFE_NO_PAD` config, plus the
//! caller-supplied-destination entry points section 4.1 requires so hot
//! paths in [`crate::reader`]/[`crate::writer`] can avoid allocating twice.

use crate::error::{JoseError, JoseResult};
use base64::{decode_config, decode_config_slice, encode_config, encode_config_slice};

const CONFIG: base64::Config = base64::URL_SAFE_NO_PAD;

/// `⌈4n/3⌉`, the exact number of characters `encode` writes for an
/// `n`-byte input.
pub fn encoded_len(n: usize) -> usize {
    ((n + 2) / 3) * 4
}

/// Upper bound on the decoded length of a `len`-character encoded string.
pub fn decoded_len_estimate(len: usize) -> usize {
    (len / 4 + 1) * 3
}

/// Allocating encode.
pub fn encode(src: &[u8]) -> String {
    encode_config(src, CONFIG)
}

/// Allocating decode. Accepts both padded and unpadded input; any byte
/// outside the URL-safe alphabet (or the `=` padding character) is an error.
pub fn decode(src: &str) -> JoseResult<Vec<u8>> {
    let trimmed = src.trim_end_matches('=');
    decode_config(trimmed, CONFIG).map_err(|e| JoseError::Base64Invalid(e.to_string()))
}

/// Decode `src` into `dest`, returning the number of bytes written.
///
/// Fails with [`JoseError::DestinationTooSmall`] rather than growing `dest`.
pub fn decode_into(src: &str, dest: &mut [u8]) -> JoseResult<usize> {
    let trimmed = src.trim_end_matches('=');
    let needed = decoded_len_estimate(trimmed.len());
    if dest.len() < needed {
        return Err(JoseError::DestinationTooSmall {
            needed,
            available: dest.len(),
        });
    }
    decode_config_slice(trimmed, CONFIG, dest).map_err(|e| JoseError::Base64Invalid(e.to_string()))
}

/// Encode `src` into `dest`, returning the number of characters written.
pub fn encode_into(src: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
    let needed = encoded_len(src.len());
    if dest.len() < needed {
        return Err(JoseError::DestinationTooSmall {
            needed,
            available: dest.len(),
        });
    }
    Ok(encode_config_slice(src, CONFIG, dest))
}
