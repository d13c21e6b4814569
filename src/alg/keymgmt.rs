//! `KeyManagementAlgorithm` (the JWE `alg` registry).

use super::pack::pack8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyManagementAlgorithm {
    pub id: u8,
    pub name: &'static str,
}

macro_rules! kw_alg {
    ($const_name:ident, $id:expr, $name:expr) => {
        pub const $const_name: KeyManagementAlgorithm = KeyManagementAlgorithm { id: $id, name: $name };
    };
}

kw_alg!(DIR, 0, "dir");
kw_alg!(A128KW, 1, "A128KW");
kw_alg!(A192KW, 2, "A192KW");
kw_alg!(A256KW, 3, "A256KW");
kw_alg!(A128GCMKW, 4, "A128GCMKW");
kw_alg!(A192GCMKW, 5, "A192GCMKW");
kw_alg!(A256GCMKW, 6, "A256GCMKW");
#[allow(clippy::upper_case_acronyms)]
kw_alg!(RSA1_5, 7, "RSA1_5");
kw_alg!(RSA_OAEP, 8, "RSA-OAEP");
kw_alg!(RSA_OAEP_256, 9, "RSA-OAEP-256");
kw_alg!(RSA_OAEP_384, 10, "RSA-OAEP-384");
kw_alg!(RSA_OAEP_512, 11, "RSA-OAEP-512");
kw_alg!(ECDH_ES, 12, "ECDH-ES");
kw_alg!(ECDH_ES_A128KW, 13, "ECDH-ES+A128KW");
kw_alg!(ECDH_ES_A192KW, 14, "ECDH-ES+A192KW");
kw_alg!(ECDH_ES_A256KW, 15, "ECDH-ES+A256KW");

pub const ALL: [KeyManagementAlgorithm; 16] = [
    DIR, A128KW, A192KW, A256KW, A128GCMKW, A192GCMKW, A256GCMKW, RSA1_5, RSA_OAEP, RSA_OAEP_256,
    RSA_OAEP_384, RSA_OAEP_512, ECDH_ES, ECDH_ES_A128KW, ECDH_ES_A192KW, ECDH_ES_A256KW,
];

/// Whether a CEK is delivered directly/derived (`dir`, `ECDH-ES`) or
/// must be unwrapped from the `ek` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Direct,
    Wrapped,
}

impl KeyManagementAlgorithm {
    pub fn delivery(self) -> Delivery {
        match self.id {
            0 | 12 => Delivery::Direct,
            _ => Delivery::Wrapped,
        }
    }

    pub fn is_ecdh(self) -> bool {
        (12..=15).contains(&self.id)
    }

    pub fn is_rsa(self) -> bool {
        (7..=11).contains(&self.id)
    }

    pub fn is_aes_kw(self) -> bool {
        (1..=3).contains(&self.id)
    }

    pub fn is_aes_gcm_kw(self) -> bool {
        (4..=6).contains(&self.id)
    }

    /// The AES-KW key size in bytes this algorithm wraps with, for
    /// AES-KW/AES-GCM-KW and the `+AxxxKW` ECDH-ES combinations.
    pub fn wrapping_key_bytes(self) -> Option<usize> {
        match self.id {
            1 | 4 | 13 => Some(16),
            2 | 5 | 14 => Some(24),
            3 | 6 | 15 => Some(32),
            _ => None,
        }
    }

    /// Section 4.5's length-indexed + packed-integer fast path; falls back
    /// to a linear scan for the one name containing a literal `+` that the
    /// length bucket for 14 bytes would otherwise need a second packed word
    /// for (`ECDH-ES+A128KW` is 14 bytes, one past the 8-byte pack window).
    pub fn try_parse(name: &str) -> Option<KeyManagementAlgorithm> {
        let bytes = name.as_bytes();
        let key = pack8(bytes);
        let candidate = match bytes.len() {
            3 => {
                if key == pack8(b"dir") {
                    Some(DIR)
                } else {
                    None
                }
            }
            6 | 7 | 8 => ALL
                .iter()
                .find(|a| a.name.len() == bytes.len() && a.name.len() <= 8 && pack8(a.name.as_bytes()) == key)
                .copied(),
            _ => None,
        };
        candidate.or_else(|| linear_scan_fallback(name))
    }
}

fn linear_scan_fallback(name: &str) -> Option<KeyManagementAlgorithm> {
    ALL.iter().find(|a| a.name == name).copied()
}

impl std::fmt::Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_canonical_name() {
        for alg in ALL {
            assert_eq!(KeyManagementAlgorithm::try_parse(alg.name), Some(alg));
        }
    }

    #[test]
    fn fast_path_agrees_with_linear_scan() {
        for c in [
            "dir", "DIR", "A128KW", "ecdh-es+a128kw", "ECDH-ES+A128KW", "RSA-OAEP-256", "garbage",
        ] {
            assert_eq!(
                KeyManagementAlgorithm::try_parse(c),
                linear_scan_fallback(c),
                "mismatch for {c}"
            );
        }
    }
}
