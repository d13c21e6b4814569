//! AES-CBC + HMAC-SHA-2 composite authenticated encryption (`AxxxCBC-HSyyy`,
//! RFC 7518 §5.2).

use super::cbc;
use crate::error::{JoseError, JoseResult};
use crate::hmac;
use crate::sha2::Sha2Variant;
use zeroize::Zeroizing;

/// Split a composite key into `(mac_key, enc_key)`, each half the
/// composite length, per section 4.4.
fn split_key(key: &[u8]) -> (Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>) {
    let half = key.len() / 2;
    (
        Zeroizing::new(key[..half].to_vec()),
        Zeroizing::new(key[half..].to_vec()),
    )
}

fn mac_input(aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let al = (aad.len() as u64) * 8;
    let mut buf = Vec::with_capacity(aad.len() + iv.len() + ciphertext.len() + 8);
    buf.extend_from_slice(aad);
    buf.extend_from_slice(iv);
    buf.extend_from_slice(ciphertext);
    buf.extend_from_slice(&al.to_be_bytes());
    buf
}

/// Encrypt with CBC then MAC `AAD || IV || CT || AL`, truncating the MAC
/// output to half its natural length to form the tag.
pub fn encrypt(
    mac_variant: Sha2Variant,
    key: &[u8],
    iv: &[u8; 16],
    plaintext: &[u8],
    aad: &[u8],
) -> JoseResult<(Vec<u8>, Vec<u8>)> {
    let (mac_key, enc_key) = split_key(key);
    let ciphertext = cbc::encrypt(&enc_key, iv, plaintext)?;
    let full_tag = hmac::compute_vec(mac_variant, &mac_key, &mac_input(aad, iv, &ciphertext));
    let tag_len = full_tag.len() / 2;
    Ok((ciphertext, full_tag[..tag_len].to_vec()))
}

/// Decrypt and verify in constant time with respect to the tag comparison.
pub fn decrypt(
    mac_variant: Sha2Variant,
    key: &[u8],
    iv: &[u8; 16],
    ciphertext: &[u8],
    aad: &[u8],
    tag: &[u8],
) -> JoseResult<Vec<u8>> {
    let (mac_key, enc_key) = split_key(key);
    let full_tag = hmac::compute_vec(mac_variant, &mac_key, &mac_input(aad, iv, ciphertext));
    let expected = match full_tag.get(..tag.len()) {
        Some(expected) => expected,
        None => return Err(JoseError::InvalidTag),
    };

    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(tag.iter()) {
        diff |= a ^ b;
    }
    if diff != 0 || expected.len() != tag.len() {
        return Err(JoseError::InvalidTag);
    }

    let mut plaintext = Vec::new();
    if !cbc::try_decrypt(&enc_key, ciphertext, iv, &mut plaintext) {
        return Err(JoseError::InvalidTag);
    }
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a128cbc_hs256_round_trip() {
        let key = [0x0Fu8; 32];
        let iv = [0u8; 16];
        let aad = b"protected-header-bytes";
        let pt = b"Live long and prosper.";
        let (ct, tag) = encrypt(Sha2Variant::Sha256, &key, &iv, pt, aad).unwrap();
        let recovered = decrypt(Sha2Variant::Sha256, &key, &iv, &ct, aad, &tag).unwrap();
        assert_eq!(recovered, pt);
    }

    #[test]
    fn oversized_tag_is_rejected_not_panicked() {
        let key = [0x0Fu8; 32];
        let iv = [0u8; 16];
        let aad = b"hdr";
        let pt = b"payload";
        let (ct, _tag) = encrypt(Sha2Variant::Sha256, &key, &iv, pt, aad).unwrap();
        let oversized_tag = vec![0u8; 9999];
        assert!(matches!(
            decrypt(Sha2Variant::Sha256, &key, &iv, &ct, aad, &oversized_tag),
            Err(JoseError::InvalidTag)
        ));
    }

    #[test]
    fn tampered_tag_fails() {
        let key = [0x0Fu8; 32];
        let iv = [0u8; 16];
        let aad = b"hdr";
        let pt = b"payload";
        let (ct, mut tag) = encrypt(Sha2Variant::Sha256, &key, &iv, pt, aad).unwrap();
        tag[0] ^= 1;
        assert!(matches!(
            decrypt(Sha2Variant::Sha256, &key, &iv, &ct, aad, &tag),
            Err(JoseError::InvalidTag)
        ));
    }
}
