//! `zip=DEF` (RFC 7516 §4.1.3): raw DEFLATE compression of the plaintext
//! before encryption.

use crate::error::{JoseError, JoseResult};
use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Read;

pub fn compress(plaintext: &[u8]) -> JoseResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(plaintext, Compression::default());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).map_err(|e| JoseError::Other(e.into()))?;
    Ok(out)
}

/// Decompress, refusing to expand past `max_bytes` (the reader's
/// `max_token_bytes` ceiling applies to the expanded plaintext too).
pub fn decompress(compressed: &[u8], max_bytes: usize) -> JoseResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(compressed).take(max_bytes as u64 + 1);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|_| JoseError::MalformedToken)?;
    if out.len() > max_bytes {
        return Err(JoseError::TokenTooLarge { max: max_bytes });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len() + 16).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn rejects_output_past_ceiling() {
        let data = vec![0x41u8; 10_000];
        let compressed = compress(&data).unwrap();
        assert!(matches!(decompress(&compressed, 100), Err(JoseError::TokenTooLarge { .. })));
    }
}
