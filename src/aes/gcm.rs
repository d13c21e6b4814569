//! AES-GCM: CTR-mode encryption plus GHASH authentication (NIST SP 800-38D).
//!
//! 96-bit IV, 128-bit tag, as required by section 4.4. The GHASH
//! multiplication is the textbook bit-at-a-time reduction; it is not
//! constant-time against a cache-timing adversary observing table
//! lookups because there are none, but the conditional branch on each key
//! bit does leak timing, same caveat the teacher crate inherits from
//! relying on its host runtime's AES-GCM. PCLMULQDQ-backed GHASH is an
//! optional fast path left for a follow-up; scalar output must match it.

use super::block::{encrypt_block, AesKeySchedule};
use crate::error::{JoseError, JoseResult};

const BLOCK: usize = 16;
const R: u128 = 0xe1 << 120;

fn xor_block(a: &[u8], b: &[u8; BLOCK]) -> [u8; BLOCK] {
    let mut out = [0u8; BLOCK];
    for i in 0..BLOCK {
        out[i] = a.get(i).copied().unwrap_or(0) ^ b[i];
    }
    out
}

fn gcm_mult(x: [u8; BLOCK], y: [u8; BLOCK]) -> [u8; BLOCK] {
    let xi = u128::from_be_bytes(x);
    let mut v = u128::from_be_bytes(y);
    let mut z = 0u128;
    for i in 0..128 {
        if (xi >> (127 - i)) & 1 == 1 {
            z ^= v;
        }
        if v & 1 == 1 {
            v = (v >> 1) ^ R;
        } else {
            v >>= 1;
        }
    }
    z.to_be_bytes()
}

fn pad16(data: &[u8]) -> Vec<u8> {
    let rem = data.len() % BLOCK;
    let mut out = data.to_vec();
    if rem != 0 {
        out.resize(data.len() + (BLOCK - rem), 0);
    }
    out
}

fn ghash(h: [u8; BLOCK], data: &[u8]) -> [u8; BLOCK] {
    let padded = pad16(data);
    let mut y = [0u8; BLOCK];
    for block in padded.chunks_exact(BLOCK) {
        let b: [u8; BLOCK] = block.try_into().unwrap();
        y = gcm_mult(xor_block(&y, &b), h);
    }
    y
}

fn inc32(block: [u8; BLOCK]) -> [u8; BLOCK] {
    let mut out = block;
    let ctr = u32::from_be_bytes([out[12], out[13], out[14], out[15]]).wrapping_add(1);
    out[12..16].copy_from_slice(&ctr.to_be_bytes());
    out
}

fn gctr(schedule: &AesKeySchedule, icb: [u8; BLOCK], data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(data.len());
    let mut cb = icb;
    for chunk in data.chunks(BLOCK) {
        let ks = encrypt_block(schedule, &cb);
        for (i, b) in chunk.iter().enumerate() {
            out.push(b ^ ks[i]);
        }
        cb = inc32(cb);
    }
    out
}

fn j0(iv: &[u8]) -> JoseResult<[u8; BLOCK]> {
    if iv.len() != 12 {
        return Err(JoseError::Other(anyhow::anyhow!(
            "AES-GCM requires a 96-bit (12-byte) IV"
        )));
    }
    let mut out = [0u8; BLOCK];
    out[..12].copy_from_slice(iv);
    out[15] = 1;
    Ok(out)
}

fn mac_input(aad: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&pad16(aad));
    buf.extend_from_slice(&pad16(ciphertext));
    buf.extend_from_slice(&((aad.len() as u64) * 8).to_be_bytes());
    buf.extend_from_slice(&((ciphertext.len() as u64) * 8).to_be_bytes());
    buf
}

/// Encrypt `plaintext` under AES-GCM, returning `(ciphertext, tag)`. `aad`
/// is authenticated but not encrypted (the raw ASCII encoded JWE header,
/// per section 4.4).
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<(Vec<u8>, [u8; 16])> {
    let schedule = AesKeySchedule::new(key);
    let h = encrypt_block(&schedule, &[0u8; BLOCK]);
    let j0 = j0(iv)?;
    let ciphertext = gctr(&schedule, inc32(j0), plaintext);
    let s = ghash(h, &mac_input(aad, &ciphertext));
    let tag = xor_block(&encrypt_block(&schedule, &j0), &s);
    Ok((ciphertext, tag))
}

/// Decrypt and verify; returns `Ok(None)` (not an error) when the tag does
/// not match, so callers can map it to [`JoseError::InvalidTag`] themselves.
pub fn decrypt(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
    tag: &[u8; 16],
) -> JoseResult<Option<Vec<u8>>> {
    let schedule = AesKeySchedule::new(key);
    let h = encrypt_block(&schedule, &[0u8; BLOCK]);
    let j0 = j0(iv)?;
    let s = ghash(h, &mac_input(aad, ciphertext));
    let expected_tag = xor_block(&encrypt_block(&schedule, &j0), &s);

    let mut diff = 0u8;
    for (a, b) in expected_tag.iter().zip(tag.iter()) {
        diff |= a ^ b;
    }
    if diff != 0 {
        return Ok(None);
    }

    Ok(Some(gctr(&schedule, inc32(j0), ciphertext)))
}
