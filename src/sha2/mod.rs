//! Streamed SHA-256/384/512 (C2).
//!
//! [`Sha2Variant`] names the three digest sizes section 3 requires.
//! [`compute_hash`] is the spec's low-level entry point: a caller-supplied
//! `prepend` block (exactly one block long) is transformed before `source`.
//! The schedule working memory itself is stack-allocated per call rather
//! than threaded through as a caller-supplied buffer, since both word
//! widths (`u32` for SHA-256, `u64` for SHA-384/512) fit comfortably on the
//! stack and a borrowed scratch buffer would gain nothing a local array
//! doesn't already give. [`digest`] is the convenience wrapper most callers
//! (HMAC, JWK thumbprints) actually use.

mod consts;
mod scalar;

use crate::error::{JoseError, JoseResult};

/// Which of the three digest sizes to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sha2Variant {
    Sha256,
    Sha384,
    Sha512,
}

impl Sha2Variant {
    pub const fn block_size(self) -> usize {
        match self {
            Sha2Variant::Sha256 => 64,
            Sha2Variant::Sha384 | Sha2Variant::Sha512 => 128,
        }
    }

    pub const fn output_size(self) -> usize {
        match self {
            Sha2Variant::Sha256 => 32,
            Sha2Variant::Sha384 => 48,
            Sha2Variant::Sha512 => 64,
        }
    }
}

/// `compute_hash(source, destination, prepend)`.
///
/// * `prepend`, if present, MUST be exactly one block and is transformed
///   first (used by HMAC to fold the inner/outer pad into the schedule
///   without materializing `pad || data` as one buffer).
///
/// The 64-bit-scratch overload for SHA-256 named in the upstream source
/// this was distilled from is not provided: SHA-256's schedule is natively
/// 32-bit, and threading a 64-bit buffer through it would only waste
/// cache, so this function allocates its own correctly-sized schedule
/// array per variant instead of taking one from the caller.
pub fn compute_hash(
    variant: Sha2Variant,
    source: &[u8],
    destination: &mut [u8],
    prepend: Option<&[u8]>,
) -> JoseResult<usize> {
    let out_len = variant.output_size();
    if destination.len() < out_len {
        return Err(JoseError::DestinationTooSmall {
            needed: out_len,
            available: destination.len(),
        });
    }
    if let Some(p) = prepend {
        if p.len() != variant.block_size() {
            return Err(JoseError::Other(anyhow::anyhow!(
                "prepend must equal the block size ({} bytes)",
                variant.block_size()
            )));
        }
    }

    match variant {
        Sha2Variant::Sha256 => {
            let mut state = consts::H256;
            let mut schedule = [0u32; 64];
            if let Some(p) = prepend {
                let block: &[u8; 64] = p.try_into().unwrap();
                scalar::compress256(&mut state, block, &mut schedule);
            }
            run_256(&mut state, source, &mut schedule);
            for (i, w) in state.iter().enumerate() {
                destination[i * 4..i * 4 + 4].copy_from_slice(&w.to_be_bytes());
            }
        }
        Sha2Variant::Sha384 | Sha2Variant::Sha512 => {
            let mut state = if variant == Sha2Variant::Sha384 {
                consts::H384
            } else {
                consts::H512
            };
            let mut schedule = [0u64; 80];
            if let Some(p) = prepend {
                let block: &[u8; 128] = p.try_into().unwrap();
                scalar::compress512(&mut state, block, &mut schedule);
            }
            run_512(&mut state, source, &mut schedule);
            let full: Vec<u8> = state.iter().flat_map(|w| w.to_be_bytes()).collect();
            destination[..out_len].copy_from_slice(&full[..out_len]);
        }
    }

    Ok(out_len)
}

fn run_256(state: &mut [u32; 8], source: &[u8], schedule: &mut [u32; 64]) {
    let mut chunks = source.chunks_exact(64);
    for block in &mut chunks {
        let b: &[u8; 64] = block.try_into().unwrap();
        scalar::compress256(state, b, schedule);
    }
    pad_and_finish_256(state, chunks.remainder(), source.len(), schedule);
}

fn pad_and_finish_256(state: &mut [u32; 8], tail: &[u8], total_len: usize, schedule: &mut [u32; 64]) {
    let bit_len = (total_len as u64) * 8;
    let mut last = tail.to_vec();
    last.push(0x80);
    if last.len() > 56 {
        last.resize(64, 0);
        let b: &[u8; 64] = (&last[..]).try_into().unwrap();
        scalar::compress256(state, b, schedule);
        last.clear();
    }
    last.resize(56, 0);
    last.extend_from_slice(&bit_len.to_be_bytes());
    let b: &[u8; 64] = (&last[..]).try_into().unwrap();
    scalar::compress256(state, b, schedule);
}

fn run_512(state: &mut [u64; 8], source: &[u8], schedule: &mut [u64; 80]) {
    let mut chunks = source.chunks_exact(128);
    for block in &mut chunks {
        let b: &[u8; 128] = block.try_into().unwrap();
        scalar::compress512(state, b, schedule);
    }
    pad_and_finish_512(state, chunks.remainder(), source.len(), schedule);
}

fn pad_and_finish_512(state: &mut [u64; 8], tail: &[u8], total_len: usize, schedule: &mut [u64; 80]) {
    // SHA-384/512 use a 128-bit length field; inputs this library handles
    // (JOSE headers/payloads under the token size ceiling) never approach
    // the high 64 bits, so only the low word is populated.
    let bit_len = (total_len as u64) * 8;
    let mut last = tail.to_vec();
    last.push(0x80);
    if last.len() > 112 {
        last.resize(128, 0);
        let b: &[u8; 128] = (&last[..]).try_into().unwrap();
        scalar::compress512(state, b, schedule);
        last.clear();
    }
    last.resize(112, 0);
    last.extend_from_slice(&0u64.to_be_bytes());
    last.extend_from_slice(&bit_len.to_be_bytes());
    let b: &[u8; 128] = (&last[..]).try_into().unwrap();
    scalar::compress512(state, b, schedule);
}

/// Allocating convenience wrapper over [`compute_hash`].
pub fn digest(variant: Sha2Variant, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; variant.output_size()];
    compute_hash(variant, data, &mut out, None).expect("static buffer sized to output_size");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn sha256_empty_matches_nist() {
        let got = digest(Sha2Variant::Sha256, b"");
        assert_eq!(
            hex(&got),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_abc_matches_nist() {
        let got = digest(Sha2Variant::Sha256, b"abc");
        assert_eq!(
            hex(&got),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha384_abc_matches_nist_vector() {
        let got = digest(Sha2Variant::Sha384, b"abc");
        assert_eq!(
            hex(&got),
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7"
        );
    }

    #[test]
    fn sha512_abc_matches_nist_vector() {
        let got = digest(Sha2Variant::Sha512, b"abc");
        assert_eq!(
            hex(&got),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn multi_block_message_matches_known_vector() {
        // NIST "two-block" message.
        let msg = b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq";
        let got = digest(Sha2Variant::Sha256, msg);
        assert_eq!(
            hex(&got),
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"
        );
    }

    #[test]
    fn compute_hash_reports_small_destination() {
        let mut small = [0u8; 4];
        let err = compute_hash(Sha2Variant::Sha256, b"abc", &mut small, None).unwrap_err();
        assert!(matches!(err, JoseError::DestinationTooSmall { .. }));
    }

    #[test]
    fn compute_hash_rejects_mis_sized_prepend() {
        let mut out = [0u8; 32];
        let err = compute_hash(Sha2Variant::Sha256, b"abc", &mut out, Some(&[0u8; 10])).unwrap_err();
        assert!(matches!(err, JoseError::Other(_)));
    }
}
