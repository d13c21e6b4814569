//! Content encryption (the `enc` side of JWE): dispatches to
//! [`crate::aes::gcm`] or [`crate::aes::cbc_hmac`] by [`crate::alg::EncryptionAlgorithm`].

use crate::aes::{cbc_hmac, gcm};
use crate::alg::{EncryptionAlgorithm, EncryptionFamily};
use crate::error::{JoseError, JoseResult};

/// Encrypt `plaintext` under `cek`, authenticating `aad` (the raw ASCII
/// encoded JWE header). Returns `(ciphertext, tag)`.
pub fn encrypt(enc: EncryptionAlgorithm, cek: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<(Vec<u8>, Vec<u8>)> {
    if cek.len() != enc.cek_size() {
        return Err(JoseError::KeySizeMismatch {
            expected: enc.cek_size(),
            actual: cek.len(),
        });
    }
    match enc.family() {
        EncryptionFamily::Gcm => {
            let iv: &[u8; 12] = iv.try_into().map_err(|_| JoseError::KeySizeMismatch { expected: 12, actual: iv.len() })?;
            let (ct, tag) = gcm::encrypt(cek, iv, plaintext, aad)?;
            Ok((ct, tag.to_vec()))
        }
        EncryptionFamily::CbcHmac(mac_variant) => {
            let iv: &[u8; 16] = iv.try_into().map_err(|_| JoseError::KeySizeMismatch { expected: 16, actual: iv.len() })?;
            cbc_hmac::encrypt(mac_variant, cek, iv, plaintext, aad)
        }
    }
}

pub fn decrypt(enc: EncryptionAlgorithm, cek: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> JoseResult<Vec<u8>> {
    if cek.len() != enc.cek_size() {
        return Err(JoseError::KeySizeMismatch {
            expected: enc.cek_size(),
            actual: cek.len(),
        });
    }
    match enc.family() {
        EncryptionFamily::Gcm => {
            let iv: &[u8; 12] = iv.try_into().map_err(|_| JoseError::KeySizeMismatch { expected: 12, actual: iv.len() })?;
            let tag: &[u8; 16] = tag.try_into().map_err(|_| JoseError::KeySizeMismatch { expected: 16, actual: tag.len() })?;
            gcm::decrypt(cek, iv, ciphertext, aad, tag)?.ok_or(JoseError::InvalidTag)
        }
        EncryptionFamily::CbcHmac(mac_variant) => {
            let iv: &[u8; 16] = iv.try_into().map_err(|_| JoseError::KeySizeMismatch { expected: 16, actual: iv.len() })?;
            cbc_hmac::decrypt(mac_variant, cek, iv, ciphertext, aad, tag)
        }
    }
}
