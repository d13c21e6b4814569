//! JSON Web Key (C5): typed symmetric/RSA/EC keys, parameter export, and
//! the RFC 7638 thumbprint.

use crate::base64url;
use crate::error::{JoseError, JoseResult};
use crate::sha2::{digest, Sha2Variant};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use zeroize::Zeroizing;

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// The EC curves this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    pub fn name(self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    /// Affine coordinate width in bytes (not bits: P-521's 521-bit
    /// coordinate is encoded as 66 bytes).
    pub fn coordinate_len(self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    pub fn from_name(name: &str) -> JoseResult<EcCurve> {
        match name {
            "P-256" => Ok(EcCurve::P256),
            "P-384" => Ok(EcCurve::P384),
            "P-521" => Ok(EcCurve::P521),
            other => Err(JoseError::UnsupportedCurve(other.to_string())),
        }
    }
}

/// The three key-material shapes section 3 requires, exactly one
/// populated per [`Jwk`].
#[derive(Clone)]
pub enum KeyMaterial {
    Symmetric {
        k: Zeroizing<Vec<u8>>,
    },
    Rsa {
        n: Vec<u8>,
        e: Vec<u8>,
        private: Option<RsaPrivateParams>,
    },
    Ec {
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
        d: Option<Zeroizing<Vec<u8>>>,
    },
}

#[derive(Clone)]
pub struct RsaPrivateParams {
    pub d: Zeroizing<Vec<u8>>,
    pub p: Option<Zeroizing<Vec<u8>>>,
    pub q: Option<Zeroizing<Vec<u8>>>,
    pub dp: Option<Zeroizing<Vec<u8>>>,
    pub dq: Option<Zeroizing<Vec<u8>>>,
    pub qi: Option<Zeroizing<Vec<u8>>>,
}

/// An immutable JSON Web Key.
///
/// `identity` is a process-lifetime arena index, not part of the JSON
/// representation: it is what [`crate::cache::CryptoCacheKey`] hashes on,
/// so that two `Jwk`s built from identical JSON material are still
/// distinct cache entries (section 9's note on avoiding accidental
/// sharing between differently-configured keys).
#[derive(Clone)]
pub struct Jwk {
    identity: u64,
    pub material: KeyMaterial,
    pub kid: Option<String>,
    pub use_: Option<String>,
    pub alg: Option<String>,
    pub key_ops: Vec<String>,
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("identity", &self.identity)
            .field("kty", &self.kty())
            .field("kid", &self.kid)
            .finish()
    }
}

impl Jwk {
    fn next_identity() -> u64 {
        NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// A process-unique identifier distinguishing this `Jwk` instance from
    /// any other, even a byte-identical one. Used only for cache keying;
    /// never serialized.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn kty(&self) -> &'static str {
        match self.material {
            KeyMaterial::Symmetric { .. } => "oct",
            KeyMaterial::Rsa { .. } => "RSA",
            KeyMaterial::Ec { .. } => "EC",
        }
    }

    pub fn new_symmetric(k: Vec<u8>) -> Jwk {
        Jwk {
            identity: Self::next_identity(),
            material: KeyMaterial::Symmetric { k: Zeroizing::new(k) },
            kid: None,
            use_: None,
            alg: None,
            key_ops: Vec::new(),
        }
    }

    pub fn new_rsa_public(n: Vec<u8>, e: Vec<u8>) -> Jwk {
        Jwk {
            identity: Self::next_identity(),
            material: KeyMaterial::Rsa { n, e, private: None },
            kid: None,
            use_: None,
            alg: None,
            key_ops: Vec::new(),
        }
    }

    pub fn new_rsa_private(n: Vec<u8>, e: Vec<u8>, private: RsaPrivateParams) -> JoseResult<Jwk> {
        if n.len() * 8 < 2048 {
            return Err(JoseError::KeyTooSmall {
                min_bits: 2048,
                actual_bits: n.len() * 8,
            });
        }
        Ok(Jwk {
            identity: Self::next_identity(),
            material: KeyMaterial::Rsa {
                n,
                e,
                private: Some(private),
            },
            kid: None,
            use_: None,
            alg: None,
            key_ops: Vec::new(),
        })
    }

    pub fn new_ec_public(curve: EcCurve, x: Vec<u8>, y: Vec<u8>) -> JoseResult<Jwk> {
        if x.len() != curve.coordinate_len() || y.len() != curve.coordinate_len() {
            return Err(JoseError::KeySizeMismatch {
                expected: curve.coordinate_len(),
                actual: x.len().max(y.len()),
            });
        }
        Ok(Jwk {
            identity: Self::next_identity(),
            material: KeyMaterial::Ec { curve, x, y, d: None },
            kid: None,
            use_: None,
            alg: None,
            key_ops: Vec::new(),
        })
    }

    pub fn new_ec_private(curve: EcCurve, x: Vec<u8>, y: Vec<u8>, d: Vec<u8>) -> JoseResult<Jwk> {
        let mut jwk = Self::new_ec_public(curve, x, y)?;
        if let KeyMaterial::Ec { d: slot, .. } = &mut jwk.material {
            *slot = Some(Zeroizing::new(d));
        }
        Ok(jwk)
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Jwk {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_use(mut self, use_: impl Into<String>) -> Jwk {
        self.use_ = Some(use_.into());
        self
    }

    pub fn with_alg(mut self, alg: impl Into<String>) -> Jwk {
        self.alg = Some(alg.into());
        self
    }

    pub fn is_private(&self) -> bool {
        match &self.material {
            KeyMaterial::Symmetric { .. } => true,
            KeyMaterial::Rsa { private, .. } => private.is_some(),
            KeyMaterial::Ec { d, .. } => d.is_some(),
        }
    }

    /// RFC 7638 thumbprint: canonical (lexicographically-sorted required
    /// fields, compact) JSON, hashed with `hash`.
    pub fn thumbprint(&self, hash: Sha2Variant) -> String {
        let canonical = match &self.material {
            KeyMaterial::Symmetric { k } => {
                format!(r#"{{"k":"{}","kty":"oct"}}"#, base64url::encode(k))
            }
            KeyMaterial::Rsa { n, e, .. } => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                base64url::encode(e),
                base64url::encode(n)
            ),
            KeyMaterial::Ec { curve, x, y, .. } => format!(
                r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
                curve.name(),
                base64url::encode(x),
                base64url::encode(y)
            ),
        };
        base64url::encode(&digest(hash, canonical.as_bytes()))
    }

    pub fn from_json(json: &str) -> JoseResult<Jwk> {
        let raw: RawJwk = serde_json::from_str(json).map_err(|e| JoseError::HeaderInvalid(e.to_string()))?;
        raw.into_jwk()
    }

    pub fn to_json(&self) -> JoseResult<String> {
        serde_json::to_string(&RawJwk::from_jwk(self)).map_err(|e| JoseError::Other(e.into()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawJwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "dp")]
    pub dp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "dq")]
    pub dq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "qi")]
    pub qi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "key_ops", skip_serializing_if = "Vec::is_empty", default)]
    pub key_ops: Vec<String>,
    #[serde(rename = "x5c", skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(rename = "x5t", skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    #[serde(rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

impl RawJwk {
    fn from_jwk(jwk: &Jwk) -> RawJwk {
        let mut raw = RawJwk {
            kty: jwk.kty().to_string(),
            k: None,
            n: None,
            e: None,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            crv: None,
            x: None,
            y: None,
            kid: jwk.kid.clone(),
            use_: jwk.use_.clone(),
            alg: jwk.alg.clone(),
            key_ops: jwk.key_ops.clone(),
            x5c: None,
            x5t: None,
            x5t_s256: None,
        };
        match &jwk.material {
            KeyMaterial::Symmetric { k } => raw.k = Some(base64url::encode(k)),
            KeyMaterial::Rsa { n, e, private } => {
                raw.n = Some(base64url::encode(n));
                raw.e = Some(base64url::encode(e));
                if let Some(p) = private {
                    raw.d = Some(base64url::encode(&p.d));
                    raw.p = p.p.as_ref().map(|v| base64url::encode(v));
                    raw.q = p.q.as_ref().map(|v| base64url::encode(v));
                    raw.dp = p.dp.as_ref().map(|v| base64url::encode(v));
                    raw.dq = p.dq.as_ref().map(|v| base64url::encode(v));
                    raw.qi = p.qi.as_ref().map(|v| base64url::encode(v));
                }
            }
            KeyMaterial::Ec { curve, x, y, d } => {
                raw.crv = Some(curve.name().to_string());
                raw.x = Some(base64url::encode(x));
                raw.y = Some(base64url::encode(y));
                raw.d = d.as_ref().map(|v| base64url::encode(v));
            }
        }
        raw
    }

    fn into_jwk(self) -> JoseResult<Jwk> {
        let material = match self.kty.as_str() {
            "oct" => {
                let k = self.k.ok_or_else(|| JoseError::HeaderInvalid("oct key missing k".into()))?;
                KeyMaterial::Symmetric {
                    k: Zeroizing::new(base64url::decode(&k)?),
                }
            }
            "RSA" => {
                let n = base64url::decode(self.n.as_deref().ok_or_else(missing("n"))?)?;
                let e = base64url::decode(self.e.as_deref().ok_or_else(missing("e"))?)?;
                let private = match self.d {
                    Some(d) => Some(RsaPrivateParams {
                        d: Zeroizing::new(base64url::decode(&d)?),
                        p: self.p.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new),
                        q: self.q.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new),
                        dp: self.dp.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new),
                        dq: self.dq.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new),
                        qi: self.qi.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new),
                    }),
                    None => None,
                };
                // Public-only keys used purely for verification may be
                // smaller; the 2048-bit floor in section 3 binds signing
                // keys specifically, so it's enforced here too, not just on
                // the `Jwk::new_rsa_private` construction path.
                if private.is_some() && n.len() * 8 < 2048 {
                    return Err(JoseError::KeyTooSmall {
                        min_bits: 2048,
                        actual_bits: n.len() * 8,
                    });
                }
                KeyMaterial::Rsa { n, e, private }
            }
            "EC" => {
                let curve = EcCurve::from_name(self.crv.as_deref().ok_or_else(missing("crv"))?)?;
                let x = base64url::decode(self.x.as_deref().ok_or_else(missing("x"))?)?;
                let y = base64url::decode(self.y.as_deref().ok_or_else(missing("y"))?)?;
                if x.len() != curve.coordinate_len() || y.len() != curve.coordinate_len() {
                    return Err(JoseError::KeySizeMismatch {
                        expected: curve.coordinate_len(),
                        actual: x.len(),
                    });
                }
                let d = self.d.map(|v| base64url::decode(&v)).transpose()?.map(Zeroizing::new);
                KeyMaterial::Ec { curve, x, y, d }
            }
            other => return Err(JoseError::HeaderInvalid(format!("unsupported kty: {other}"))),
        };

        Ok(Jwk {
            identity: Jwk::next_identity(),
            material,
            kid: self.kid,
            use_: self.use_,
            alg: self.alg,
            key_ops: self.key_ops,
        })
    }
}

fn missing(field: &'static str) -> impl FnOnce() -> JoseError {
    move || JoseError::HeaderInvalid(format!("missing required field: {field}"))
}

/// A JWK Set (RFC 7517 §5).
#[derive(Debug, Clone, Default)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn new(keys: Vec<Jwk>) -> Jwks {
        Jwks { keys }
    }

    /// Select by `kid` when present, else fall back to `kty` + `alg`, per
    /// section 4.7 step 3: among same-`kty` candidates, prefer one whose
    /// own `alg` field matches the token's algorithm exactly, and only
    /// fall back to a candidate with no `alg` restriction at all if none
    /// matches. This disambiguates e.g. two RSA keys in the same `Jwks`,
    /// one restricted to `RS256` and one to `PS256`.
    pub fn find(&self, kid: Option<&str>, kty: &str, alg: Option<&str>) -> Option<&Jwk> {
        if let Some(kid) = kid {
            return self.keys.iter().find(|k| k.kid.as_deref() == Some(kid));
        }
        let candidates: Vec<&Jwk> = self.keys.iter().filter(|k| k.kty() == kty).collect();
        match alg {
            Some(alg) => candidates
                .iter()
                .find(|k| k.alg.as_deref() == Some(alg))
                .or_else(|| candidates.iter().find(|k| k.alg.is_none()))
                .copied(),
            None => candidates.into_iter().next(),
        }
    }

    pub fn from_json(json: &str) -> JoseResult<Jwks> {
        #[derive(Deserialize)]
        struct RawSet {
            keys: Vec<RawJwk>,
        }
        let raw: RawSet = serde_json::from_str(json).map_err(|e| JoseError::HeaderInvalid(e.to_string()))?;
        let keys = raw.keys.into_iter().map(|r| r.into_jwk()).collect::<JoseResult<Vec<_>>>()?;
        Ok(Jwks { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_json_round_trip() {
        let jwk = Jwk::new_symmetric(b"0123456789abcdef".to_vec()).with_kid("k1");
        let json = jwk.to_json().unwrap();
        let back = Jwk::from_json(&json).unwrap();
        assert_eq!(back.kid.as_deref(), Some("k1"));
        match back.material {
            KeyMaterial::Symmetric { k } => assert_eq!(&k[..], b"0123456789abcdef"),
            _ => panic!("expected symmetric"),
        }
    }

    #[test]
    fn distinct_instances_have_distinct_identity() {
        let a = Jwk::new_symmetric(vec![1, 2, 3]);
        let b = Jwk::new_symmetric(vec![1, 2, 3]);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn rsa_key_below_2048_bits_is_rejected() {
        let small_n = vec![0xFFu8; 128]; // 1024 bits
        let e = vec![1, 0, 1];
        let private = RsaPrivateParams {
            d: Zeroizing::new(vec![1]),
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        };
        let result = Jwk::new_rsa_private(small_n, e, private);
        assert!(matches!(result, Err(JoseError::KeyTooSmall { .. })));
    }

    #[test]
    fn ec_coordinate_size_must_match_curve() {
        let result = Jwk::new_ec_public(EcCurve::P256, vec![0u8; 10], vec![0u8; 32]);
        assert!(matches!(result, Err(JoseError::KeySizeMismatch { .. })));
    }

    #[test]
    fn thumbprint_is_stable_for_identical_material() {
        let a = Jwk::new_symmetric(b"same-key-bytes!!".to_vec());
        let b = Jwk::new_symmetric(b"same-key-bytes!!".to_vec());
        assert_eq!(a.thumbprint(Sha2Variant::Sha256), b.thumbprint(Sha2Variant::Sha256));
    }

    #[test]
    fn jwks_finds_by_kid_then_kty() {
        let k1 = Jwk::new_symmetric(vec![1]).with_kid("one");
        let k2 = Jwk::new_symmetric(vec![2]).with_kid("two");
        let set = Jwks::new(vec![k1, k2]);
        assert_eq!(set.find(Some("two"), "oct", None).unwrap().kid.as_deref(), Some("two"));
        assert!(set.find(Some("missing"), "oct", None).is_none());
        assert!(set.find(None, "oct", None).is_some());
    }

    #[test]
    fn jwks_disambiguates_same_kty_candidates_by_alg() {
        let rs256_key = Jwk::new_rsa_public(vec![0xAAu8; 256], vec![1, 0, 1]).with_kid("rs256").with_alg("RS256");
        let ps256_key = Jwk::new_rsa_public(vec![0xBBu8; 256], vec![1, 0, 1]).with_kid("ps256").with_alg("PS256");
        let set = Jwks::new(vec![rs256_key, ps256_key]);
        assert_eq!(set.find(None, "RSA", Some("PS256")).unwrap().kid.as_deref(), Some("ps256"));
        assert_eq!(set.find(None, "RSA", Some("RS256")).unwrap().kid.as_deref(), Some("rs256"));
    }

    #[test]
    fn jwks_falls_back_to_unrestricted_candidate_when_alg_unmatched() {
        let restricted = Jwk::new_symmetric(vec![1]).with_alg("HS384");
        let unrestricted = Jwk::new_symmetric(vec![2]).with_kid("any");
        let set = Jwks::new(vec![restricted, unrestricted]);
        assert_eq!(set.find(None, "oct", Some("HS256")).unwrap().kid.as_deref(), Some("any"));
    }

    #[test]
    fn json_loaded_rsa_private_key_below_2048_bits_is_rejected() {
        let json = serde_json::json!({
            "kty": "RSA",
            "n": base64url::encode(&[0xFFu8; 128]),
            "e": base64url::encode(&[1, 0, 1]),
            "d": base64url::encode(&[1]),
        })
        .to_string();
        let result = Jwk::from_json(&json);
        assert!(matches!(result, Err(JoseError::KeyTooSmall { .. })));
    }
}
