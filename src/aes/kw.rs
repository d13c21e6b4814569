//! AES Key Wrap (RFC 3394) over 64-bit half-blocks.

use super::block::{decrypt_block, encrypt_block, AesKeySchedule};
use crate::error::{JoseError, JoseResult};

const DEFAULT_IV: u64 = 0xA6A6A6A6A6A6A6A6;

/// Wrap `key_data` (an n-block content encryption key, n >= 1, each block
/// 8 bytes) under `kek`.
pub fn wrap(kek: &[u8], key_data: &[u8]) -> JoseResult<Vec<u8>> {
    if key_data.len() % 8 != 0 || key_data.is_empty() {
        return Err(JoseError::Other(anyhow::anyhow!(
            "AES key wrap input must be a non-empty multiple of 8 bytes"
        )));
    }
    let n = key_data.len() / 8;
    let schedule = AesKeySchedule::new(kek);
    let mut r: Vec<[u8; 8]> = key_data.chunks_exact(8).map(|c| c.try_into().unwrap()).collect();
    let mut a = DEFAULT_IV;

    for j in 0..6u64 {
        for i in 1..=n as u64 {
            let mut block = [0u8; 16];
            block[..8].copy_from_slice(&a.to_be_bytes());
            block[8..].copy_from_slice(&r[(i - 1) as usize]);
            let b = encrypt_block(&schedule, &block);
            let t = n as u64 * j + i;
            a = u64::from_be_bytes(b[..8].try_into().unwrap()) ^ t;
            r[(i - 1) as usize] = b[8..].try_into().unwrap();
        }
    }

    let mut out = Vec::with_capacity(8 + key_data.len());
    out.extend_from_slice(&a.to_be_bytes());
    for block in &r {
        out.extend_from_slice(block);
    }
    Ok(out)
}

/// Unwrap a wrapped key. Fails with [`JoseError::InvalidKeyWrap`] if the
/// recovered IV does not match [`DEFAULT_IV`].
pub fn unwrap(kek: &[u8], wrapped: &[u8]) -> JoseResult<Vec<u8>> {
    if wrapped.len() % 8 != 0 || wrapped.len() < 24 {
        return Err(JoseError::InvalidKeyWrap);
    }
    let n = wrapped.len() / 8 - 1;
    let schedule = AesKeySchedule::new(kek);
    let mut a = u64::from_be_bytes(wrapped[..8].try_into().unwrap());
    let mut r: Vec<[u8; 8]> = wrapped[8..].chunks_exact(8).map(|c| c.try_into().unwrap()).collect();

    for j in (0..6u64).rev() {
        for i in (1..=n as u64).rev() {
            let t = n as u64 * j + i;
            let mut block = [0u8; 16];
            block[..8].copy_from_slice(&(a ^ t).to_be_bytes());
            block[8..].copy_from_slice(&r[(i - 1) as usize]);
            let b = decrypt_block(&schedule, &block);
            a = u64::from_be_bytes(b[..8].try_into().unwrap());
            r[(i - 1) as usize] = b[8..].try_into().unwrap();
        }
    }

    if a != DEFAULT_IV {
        return Err(JoseError::InvalidKeyWrap);
    }

    let mut out = Vec::with_capacity(wrapped.len() - 8);
    for block in &r {
        out.extend_from_slice(block);
    }
    Ok(out)
}
