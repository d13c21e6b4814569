//! `EncryptionAlgorithm` (the JWE `enc` registry).

use super::pack::pack8;
use crate::sha2::Sha2Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptionAlgorithm {
    pub id: u8,
    pub name: &'static str,
}

macro_rules! enc_alg {
    ($const_name:ident, $id:expr, $name:expr) => {
        pub const $const_name: EncryptionAlgorithm = EncryptionAlgorithm { id: $id, name: $name };
    };
}

enc_alg!(A128CBC_HS256, 0, "A128CBC-HS256");
enc_alg!(A192CBC_HS384, 1, "A192CBC-HS384");
enc_alg!(A256CBC_HS512, 2, "A256CBC-HS512");
enc_alg!(A128GCM, 3, "A128GCM");
enc_alg!(A192GCM, 4, "A192GCM");
enc_alg!(A256GCM, 5, "A256GCM");

pub const ALL: [EncryptionAlgorithm; 6] = [
    A128CBC_HS256, A192CBC_HS384, A256CBC_HS512, A128GCM, A192GCM, A256GCM,
];

/// Which family of [`crate::aes`] primitives an encryption algorithm uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    CbcHmac(Sha2Variant),
    Gcm,
}

impl EncryptionAlgorithm {
    pub fn family(self) -> Family {
        match self.id {
            0 => Family::CbcHmac(Sha2Variant::Sha256),
            1 => Family::CbcHmac(Sha2Variant::Sha384),
            2 => Family::CbcHmac(Sha2Variant::Sha512),
            _ => Family::Gcm,
        }
    }

    /// The full content-encryption key size in bytes (for CBC+HMAC this is
    /// twice the AES key size, since the key is split into MAC || ENC
    /// halves).
    pub fn cek_size(self) -> usize {
        match self.id {
            0 => 32,
            1 => 48,
            2 => 64,
            3 => 16,
            4 => 24,
            5 => 32,
            _ => unreachable!(),
        }
    }

    pub fn iv_size(self) -> usize {
        match self.family() {
            Family::CbcHmac(_) => 16,
            Family::Gcm => 12,
        }
    }

    pub fn try_parse(name: &str) -> Option<EncryptionAlgorithm> {
        let bytes = name.as_bytes();
        let key = pack8(bytes);
        let candidate = match bytes.len() {
            7 | 8 => ALL
                .iter()
                .find(|a| a.name.len() == bytes.len() && pack8(a.name.as_bytes()) == key)
                .copied(),
            _ => None,
        };
        candidate.or_else(|| linear_scan_fallback(name))
    }
}

fn linear_scan_fallback(name: &str) -> Option<EncryptionAlgorithm> {
    ALL.iter().find(|a| a.name == name).copied()
}

impl std::fmt::Display for EncryptionAlgorithm {
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
            assert_eq!(EncryptionAlgorithm::try_parse(alg.name), Some(alg));
        }
    }

    #[test]
    fn fast_path_agrees_with_linear_scan() {
        for c in ["A128GCM", "a128gcm", "A128CBC-HS256", "bogus-enc"] {
            assert_eq!(EncryptionAlgorithm::try_parse(c), linear_scan_fallback(c));
        }
    }

    #[test]
    fn cek_sizes_match_rfc7518_table() {
        assert_eq!(A128CBC_HS256.cek_size(), 32);
        assert_eq!(A256GCM.cek_size(), 32);
        assert_eq!(A192CBC_HS384.cek_size(), 48);
    }
}
