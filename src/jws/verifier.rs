use crate::alg::{KeyFamily, SignatureAlgorithm, SignaturePadding};
use crate::cache::ObjectPool;
use crate::error::{JoseError, JoseResult};
use crate::keyconv;
use crate::jwk::{Jwk, KeyMaterial};
use crate::sha2;
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Public};
use openssl::rsa::Padding;
use openssl::sign::RsaPssSaltlen;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

enum Engine {
    Hmac { key: Vec<u8> },
    Rsa { pkey: PKey<Public> },
    Ec { eckey: openssl::ec::EcKey<Public>, coordinate_len: usize },
}

/// A verifier bound to one `(key, algorithm)` pair (C7).
pub struct Verifier {
    alg: SignatureAlgorithm,
    pool: Arc<ObjectPool<Engine>>,
    key: Arc<Jwk>,
    disposed: AtomicBool,
}

impl Verifier {
    pub fn new(key: Arc<Jwk>, alg: SignatureAlgorithm) -> JoseResult<Verifier> {
        let family_matches = match (alg.key_family(), &key.material) {
            (KeyFamily::Symmetric, KeyMaterial::Symmetric { .. }) => true,
            (KeyFamily::Rsa, KeyMaterial::Rsa { .. }) => true,
            (KeyFamily::Ec, KeyMaterial::Ec { .. }) => true,
            (KeyFamily::None, _) => true,
            _ => false,
        };
        if !family_matches {
            return Err(JoseError::HeaderInvalid(format!(
                "key kty={} is not usable to verify with {}",
                key.kty(),
                alg
            )));
        }
        Ok(Verifier {
            alg,
            pool: Arc::new(ObjectPool::new()),
            key,
            disposed: AtomicBool::new(false),
        })
    }

    fn build_engine(&self) -> JoseResult<Engine> {
        match self.alg.key_family() {
            KeyFamily::Symmetric => match &self.key.material {
                KeyMaterial::Symmetric { k } => Ok(Engine::Hmac { key: k.to_vec() }),
                _ => unreachable!("checked at construction"),
            },
            KeyFamily::Rsa => {
                let rsa = keyconv::rsa_public_from_jwk(&self.key)?;
                let pkey = PKey::from_rsa(rsa).map_err(|e| JoseError::Other(e.into()))?;
                Ok(Engine::Rsa { pkey })
            }
            KeyFamily::Ec => {
                let eckey = keyconv::ec_public_from_jwk(&self.key)?;
                let coordinate_len = self.alg.fixed_signature_len() / 2;
                Ok(Engine::Ec { eckey, coordinate_len })
            }
            KeyFamily::None => Ok(Engine::Hmac { key: Vec::new() }),
        }
    }

    /// Verify `signature` over `data` (the ASCII `header.payload` signing
    /// input).
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> JoseResult<bool> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(JoseError::Disposed);
        }
        if self.alg.is_none() {
            return Ok(signature.is_empty());
        }
        let mut handle = self.pool.acquire(|| self.build_engine())?;
        match &mut *handle {
            Engine::Hmac { key } => crate::hmac::verify(self.alg.digest(), key, data, signature),
            Engine::Rsa { pkey } => verify_rsa(pkey, self.alg, data, signature),
            Engine::Ec { eckey, coordinate_len } => {
                verify_ec(eckey, self.alg.digest(), data, signature, *coordinate_len)
            }
        }
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

fn verify_rsa(pkey: &PKey<Public>, alg: SignatureAlgorithm, data: &[u8], signature: &[u8]) -> JoseResult<bool> {
    let digest = message_digest(alg);
    let mut verifier = openssl::sign::Verifier::new(digest, pkey).map_err(|e| JoseError::Other(e.into()))?;
    if alg.padding() == SignaturePadding::Pss {
        verifier.set_rsa_padding(Padding::PKCS1_PSS).map_err(|e| JoseError::Other(e.into()))?;
        verifier
            .set_rsa_mgf1_md(digest)
            .map_err(|e| JoseError::Other(e.into()))?;
        verifier
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .map_err(|e| JoseError::Other(e.into()))?;
    }
    verifier.update(data).map_err(|e| JoseError::Other(e.into()))?;
    verifier.verify(signature).map_err(|e| JoseError::Other(e.into()))
}

fn verify_ec(
    eckey: &openssl::ec::EcKey<Public>,
    digest: sha2::Sha2Variant,
    data: &[u8],
    signature: &[u8],
    coordinate_len: usize,
) -> JoseResult<bool> {
    if signature.len() != coordinate_len * 2 {
        return Ok(false);
    }
    let (r_bytes, s_bytes) = signature.split_at(coordinate_len);
    let r = openssl::bn::BigNum::from_slice(r_bytes).map_err(|e| JoseError::Other(e.into()))?;
    let s = openssl::bn::BigNum::from_slice(s_bytes).map_err(|e| JoseError::Other(e.into()))?;
    let sig = EcdsaSig::from_private_components(r, s).map_err(|e| JoseError::Other(e.into()))?;
    let hash = sha2::digest(digest, data);
    Ok(sig.verify(&hash, eckey).unwrap_or(false))
}

fn message_digest(alg: SignatureAlgorithm) -> MessageDigest {
    match alg.digest() {
        sha2::Sha2Variant::Sha256 => MessageDigest::sha256(),
        sha2::Sha2Variant::Sha384 => MessageDigest::sha384(),
        sha2::Sha2Variant::Sha512 => MessageDigest::sha512(),
    }
}
