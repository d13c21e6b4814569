//! AES-CBC with PKCS#7 padding.

use super::block::{decrypt_block, encrypt_block, AesKeySchedule};
use crate::error::{JoseError, JoseResult};

const BLOCK: usize = 16;

/// `encrypt(key, iv, plaintext)`. `plaintext` must be non-empty; `iv` must
/// be 16 bytes. Output length is `((plaintext.len() + 16) & !15)`.
pub fn encrypt(key: &[u8], iv: &[u8; 16], plaintext: &[u8]) -> JoseResult<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(JoseError::Other(anyhow::anyhow!(
            "AES-CBC plaintext must be non-empty"
        )));
    }
    let schedule = AesKeySchedule::new(key);
    let pad_len = BLOCK - (plaintext.len() % BLOCK);
    let mut padded = Vec::with_capacity(plaintext.len() + pad_len);
    padded.extend_from_slice(plaintext);
    padded.resize(plaintext.len() + pad_len, pad_len as u8);

    let mut out = Vec::with_capacity(padded.len());
    let mut prev = *iv;
    for chunk in padded.chunks_exact(BLOCK) {
        let mut block = [0u8; BLOCK];
        for i in 0..BLOCK {
            block[i] = chunk[i] ^ prev[i];
        }
        let ct = encrypt_block(&schedule, &block);
        out.extend_from_slice(&ct);
        prev = ct;
    }
    Ok(out)
}

/// `try_decrypt(key, ct, iv, pt_buf) -> (ok, bytes_written)`; returns
/// `false` on bad padding rather than treating it as an error, per section
/// 4.4 (so callers can fold this into a constant-shape failure path).
pub fn try_decrypt(key: &[u8], ciphertext: &[u8], iv: &[u8; 16], dest: &mut Vec<u8>) -> bool {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK != 0 {
        return false;
    }
    let schedule = AesKeySchedule::new(key);
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut prev = *iv;
    for chunk in ciphertext.chunks_exact(BLOCK) {
        let block: [u8; BLOCK] = chunk.try_into().unwrap();
        let decrypted = decrypt_block(&schedule, &block);
        let mut pt_block = [0u8; BLOCK];
        for i in 0..BLOCK {
            pt_block[i] = decrypted[i] ^ prev[i];
        }
        plaintext.extend_from_slice(&pt_block);
        prev = block;
    }

    let pad_len = *plaintext.last().unwrap() as usize;
    if pad_len == 0 || pad_len > BLOCK || pad_len > plaintext.len() {
        return false;
    }
    let pad_start = plaintext.len() - pad_len;
    if !plaintext[pad_start..].iter().all(|&b| b as usize == pad_len) {
        return false;
    }
    plaintext.truncate(pad_start);
    dest.clear();
    dest.extend_from_slice(&plaintext);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [0x42u8; 16];
        let iv = [0x24u8; 16];
        let pt = b"Live long and prosper.";
        let ct = encrypt(&key, &iv, pt).unwrap();
        assert_eq!(ct.len() % 16, 0);
        let mut recovered = Vec::new();
        assert!(try_decrypt(&key, &ct, &iv, &mut recovered));
        assert_eq!(recovered, pt);
    }

    #[test]
    fn rejects_bad_padding() {
        let key = [0x11u8; 16];
        let iv = [0u8; 16];
        let mut ct = encrypt(&key, &iv, b"some plaintext here").unwrap();
        *ct.last_mut().unwrap() ^= 0xFF;
        let mut out = Vec::new();
        assert!(!try_decrypt(&key, &ct, &iv, &mut out));
    }

    #[test]
    fn ciphertext_length_is_block_aligned_upper_bound() {
        let key = [0x01u8; 32];
        let iv = [0x02u8; 16];
        for len in [1usize, 15, 16, 17, 31, 32] {
            let pt = vec![0xAAu8; len];
            let ct = encrypt(&key, &iv, &pt).unwrap();
            assert_eq!(ct.len(), (len + 16) & !15);
        }
    }
}
