//! Concat KDF (NIST SP 800-56A §5.8.1), the key derivation function RFC
//! 7518 §4.6 layers over ECDH-ES's raw shared secret. Always uses SHA-256
//! regardless of the `enc`/`alg` in play, per the RFC.

use crate::sha2::{digest, Sha2Variant};

fn length_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

/// Derive `key_data_len_bits / 8` bytes from the shared secret `z`.
///
/// `algorithm_id` is the `enc` value for Direct Key Agreement or the `alg`
/// value for Key Agreement with Key Wrapping (RFC 7518 §4.6.2); `apu`/`apv`
/// are the (possibly empty) `PartyUInfo`/`PartyVInfo` byte strings.
pub fn derive(z: &[u8], algorithm_id: &str, apu: &[u8], apv: &[u8], key_data_len_bits: u32) -> Vec<u8> {
    let mut other_info = Vec::new();
    length_prefixed(&mut other_info, algorithm_id.as_bytes());
    length_prefixed(&mut other_info, apu);
    length_prefixed(&mut other_info, apv);
    other_info.extend_from_slice(&key_data_len_bits.to_be_bytes());

    let key_data_len_bytes = (key_data_len_bits as usize + 7) / 8;
    let hash_len = Sha2Variant::Sha256.output_size();
    let reps = (key_data_len_bytes + hash_len - 1) / hash_len;

    let mut output = Vec::with_capacity(reps * hash_len);
    for counter in 1..=reps as u32 {
        let mut input = Vec::with_capacity(4 + z.len() + other_info.len());
        input.extend_from_slice(&counter.to_be_bytes());
        input.extend_from_slice(z);
        input.extend_from_slice(&other_info);
        output.extend_from_slice(&digest(Sha2Variant::Sha256, &input));
    }
    output.truncate(key_data_len_bytes);
    output
}
