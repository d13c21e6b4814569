//! HMAC-SHA-2 (C3), built over [`crate::sha2`].

use crate::error::{JoseError, JoseResult};
use crate::sha2::{compute_hash, digest, Sha2Variant};
use zeroize::Zeroizing;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5C;

/// Build the zero-padded, block-sized inner/outer pad key for `key` under
/// `variant`. Keys longer than the block size are pre-hashed (RFC 2104).
fn block_sized_key(variant: Sha2Variant, key: &[u8]) -> Zeroizing<Vec<u8>> {
    let block_size = variant.block_size();
    let mut padded = if key.len() > block_size {
        digest(variant, key)
    } else {
        key.to_vec()
    };
    padded.resize(block_size, 0);
    Zeroizing::new(padded)
}

/// `compute(key, data, dest)`: HMAC-SHA-2 over `data`, written to `dest`.
pub fn compute(variant: Sha2Variant, key: &[u8], data: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
    let out_len = variant.output_size();
    if dest.len() < out_len {
        return Err(JoseError::DestinationTooSmall {
            needed: out_len,
            available: dest.len(),
        });
    }

    let block_key = block_sized_key(variant, key);
    let mut ipad_block = Zeroizing::new(vec![0u8; variant.block_size()]);
    let mut opad_block = Zeroizing::new(vec![0u8; variant.block_size()]);
    for i in 0..variant.block_size() {
        ipad_block[i] = block_key[i] ^ IPAD;
        opad_block[i] = block_key[i] ^ OPAD;
    }

    let mut inner_input = Zeroizing::new(Vec::with_capacity(data.len()));
    inner_input.extend_from_slice(data);
    let mut inner_digest = vec![0u8; out_len];
    compute_hash(variant, &inner_input, &mut inner_digest, Some(&ipad_block))?;

    compute_hash(variant, &inner_digest, dest, Some(&opad_block))?;
    Ok(out_len)
}

/// Allocating convenience wrapper over [`compute`].
pub fn compute_vec(variant: Sha2Variant, key: &[u8], data: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut out = vec![0u8; variant.output_size()];
    compute(variant, key, data, &mut out).expect("static buffer sized to output_size");
    Zeroizing::new(out)
}

/// Constant-time tag comparison.
fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// `verify(key, data, tag)`, constant-time with respect to the comparison.
pub fn verify(variant: Sha2Variant, key: &[u8], data: &[u8], tag: &[u8]) -> JoseResult<bool> {
    let computed = compute_vec(variant, key, data);
    Ok(fixed_time_eq(&computed, tag))
}
