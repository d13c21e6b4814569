//! `SignatureAlgorithm` (the JWS `alg` registry).

use super::pack::pack8;

/// Which OpenSSL-backed padding scheme a signature algorithm signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePadding {
    /// HMAC, no asymmetric padding.
    None,
    /// RSASSA-PKCS1-v1_5.
    Pkcs1,
    /// RSASSA-PSS.
    Pss,
    /// ECDSA with the IEEE P1363 fixed-width `r || s` encoding (not DER).
    P1363,
}

/// Key family a signature algorithm operates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Symmetric,
    Rsa,
    Ec,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureAlgorithm {
    pub id: u8,
    pub name: &'static str,
}

macro_rules! sig_alg {
    ($const_name:ident, $id:expr, $name:expr) => {
        pub const $const_name: SignatureAlgorithm = SignatureAlgorithm { id: $id, name: $name };
    };
}

sig_alg!(HS256, 0, "HS256");
sig_alg!(HS384, 1, "HS384");
sig_alg!(HS512, 2, "HS512");
sig_alg!(RS256, 3, "RS256");
sig_alg!(RS384, 4, "RS384");
sig_alg!(RS512, 5, "RS512");
sig_alg!(PS256, 6, "PS256");
sig_alg!(PS384, 7, "PS384");
sig_alg!(PS512, 8, "PS512");
sig_alg!(ES256, 9, "ES256");
sig_alg!(ES384, 10, "ES384");
sig_alg!(ES512, 11, "ES512");
sig_alg!(NONE, 12, "none");

pub const ALL: [SignatureAlgorithm; 13] = [
    HS256, HS384, HS512, RS256, RS384, RS512, PS256, PS384, PS512, ES256, ES384, ES512, NONE,
];

impl SignatureAlgorithm {
    pub fn digest(self) -> crate::sha2::Sha2Variant {
        use crate::sha2::Sha2Variant::*;
        match self.id {
            0 | 3 | 6 | 9 => Sha256,
            1 | 4 | 7 | 10 => Sha384,
            2 | 5 | 8 | 11 => Sha512,
            _ => Sha256,
        }
    }

    pub fn padding(self) -> SignaturePadding {
        match self.id {
            0..=2 => SignaturePadding::None,
            3..=5 => SignaturePadding::Pkcs1,
            6..=8 => SignaturePadding::Pss,
            9..=11 => SignaturePadding::P1363,
            _ => SignaturePadding::None,
        }
    }

    pub fn is_none(self) -> bool {
        self.id == NONE.id
    }

    pub fn key_family(self) -> KeyFamily {
        match self.id {
            0..=2 => KeyFamily::Symmetric,
            3..=8 => KeyFamily::Rsa,
            9..=11 => KeyFamily::Ec,
            _ => KeyFamily::None,
        }
    }

    pub fn min_rsa_key_bits(self) -> usize {
        2048
    }

    pub fn ec_curve_bits(self) -> Option<usize> {
        match self.id {
            9 => Some(256),
            10 => Some(384),
            11 => Some(521),
            _ => None,
        }
    }

    /// `signature_len` in bytes: the fixed output width for symmetric/EC
    /// algorithms, or 0 for algorithms whose signature length depends on
    /// the RSA modulus (determined at signer construction time instead).
    pub fn fixed_signature_len(self) -> usize {
        match self.id {
            0 => 32,
            1 => 48,
            2 => 64,
            9 => 64,  // P-256: 32 + 32
            10 => 96, // P-384: 48 + 48
            11 => 132, // P-521: 66 + 66
            _ => 0,
        }
    }

    /// Parse a canonical algorithm name. Names of length 3-5 take the
    /// packed-integer fast path (every name in this registry is <= 5
    /// bytes); anything else falls straight to `None`.
    pub fn try_parse(name: &str) -> Option<SignatureAlgorithm> {
        let bytes = name.as_bytes();
        if bytes.len() > 8 {
            return None;
        }
        let key = pack8(bytes);
        let candidate = match bytes.len() {
            4 => {
                if key == pack8(b"none") {
                    Some(NONE)
                } else {
                    None
                }
            }
            5 => ALL.iter().find(|a| a.name.len() == 5 && pack8(a.name.as_bytes()) == key).copied(),
            _ => None,
        };
        candidate.or_else(|| linear_scan_fallback(name))
    }
}

/// Fallback for anything the length-bucketed fast path didn't resolve;
/// also the reference implementation the fast path is checked against in
/// tests.
fn linear_scan_fallback(name: &str) -> Option<SignatureAlgorithm> {
    ALL.iter().find(|a| a.name == name).copied()
}

impl std::fmt::Display for SignatureAlgorithm {
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
            assert_eq!(SignatureAlgorithm::try_parse(alg.name), Some(alg));
        }
    }

    #[test]
    fn fast_path_agrees_with_linear_scan_on_random_strings() {
        let candidates = [
            "HS256", "hs256", "RS512", "xxxxx", "", "a", "ES256K", "none", "None", "PS384x",
        ];
        for c in candidates {
            assert_eq!(SignatureAlgorithm::try_parse(c), linear_scan_fallback(c));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(SignatureAlgorithm::try_parse("bogus"), None);
    }
}
