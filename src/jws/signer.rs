use crate::alg::{KeyFamily, SignatureAlgorithm, SignaturePadding};
use crate::cache::ObjectPool;
use crate::error::{JoseError, JoseResult};
use crate::keyconv::{self, left_pad};
use crate::jwk::{Jwk, KeyMaterial};
use crate::sha2;
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Padding;
use openssl::sign::RsaPssSaltlen;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zeroize::Zeroizing;

/// A thread-unsafe primitive signing handle, pooled per [`Signer`].
#[derive(Debug)]
enum Engine {
    Hmac { key: Zeroizing<Vec<u8>> },
    Rsa { pkey: PKey<Private> },
    Ec { pkey: openssl::ec::EcKey<Private>, coordinate_len: usize },
}

/// A signer bound to one `(key, algorithm)` pair (C7). Caches its engine in
/// an internal pool rather than rebuilding it per call.
#[derive(Debug)]
pub struct Signer {
    alg: SignatureAlgorithm,
    pool: Arc<ObjectPool<Engine>>,
    key: Arc<Jwk>,
    disposed: AtomicBool,
}

impl Signer {
    pub fn new(key: Arc<Jwk>, alg: SignatureAlgorithm) -> JoseResult<Signer> {
        let family_matches = match (alg.key_family(), &key.material) {
            (KeyFamily::Symmetric, KeyMaterial::Symmetric { .. }) => true,
            (KeyFamily::Rsa, KeyMaterial::Rsa { private: Some(_), .. }) => true,
            (KeyFamily::Ec, KeyMaterial::Ec { d: Some(_), .. }) => true,
            (KeyFamily::None, _) => true,
            _ => false,
        };
        if !family_matches {
            return Err(JoseError::HeaderInvalid(format!(
                "key kty={} is not usable to sign with {}",
                key.kty(),
                alg
            )));
        }
        Ok(Signer {
            alg,
            pool: Arc::new(ObjectPool::new()),
            key,
            disposed: AtomicBool::new(false),
        })
    }

    fn build_engine(&self) -> JoseResult<Engine> {
        match self.alg.key_family() {
            KeyFamily::Symmetric => match &self.key.material {
                KeyMaterial::Symmetric { k } => Ok(Engine::Hmac { key: k.clone() }),
                _ => unreachable!("checked at construction"),
            },
            KeyFamily::Rsa => {
                let rsa = keyconv::rsa_private_from_jwk(&self.key)?;
                let pkey = PKey::from_rsa(rsa).map_err(|e| JoseError::Other(e.into()))?;
                Ok(Engine::Rsa { pkey })
            }
            KeyFamily::Ec => {
                let ec = keyconv::ec_private_from_jwk(&self.key)?;
                let coordinate_len = self.alg.fixed_signature_len() / 2;
                Ok(Engine::Ec { pkey: ec, coordinate_len })
            }
            KeyFamily::None => Ok(Engine::Hmac { key: Zeroizing::new(Vec::new()) }),
        }
    }

    /// Sign `data` (the ASCII `header.payload` signing input), returning
    /// the raw signature bytes.
    pub fn sign(&self, data: &[u8]) -> JoseResult<Vec<u8>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(JoseError::Disposed);
        }
        if self.alg.is_none() {
            return Ok(Vec::new());
        }
        let mut handle = self.pool.acquire(|| self.build_engine())?;
        match &mut *handle {
            Engine::Hmac { key } => {
                let mut tag = vec![0u8; self.alg.digest().output_size()];
                crate::hmac::compute(self.alg.digest(), key, data, &mut tag)?;
                Ok(tag)
            }
            Engine::Rsa { pkey } => sign_rsa(pkey, self.alg, data),
            Engine::Ec { pkey, coordinate_len } => sign_ec(pkey, self.alg.digest(), data, *coordinate_len),
        }
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

fn sign_rsa(pkey: &PKey<Private>, alg: SignatureAlgorithm, data: &[u8]) -> JoseResult<Vec<u8>> {
    let digest = message_digest(alg);
    let mut signer = openssl::sign::Signer::new(digest, pkey).map_err(|e| JoseError::Other(e.into()))?;
    if alg.padding() == SignaturePadding::Pss {
        signer.set_rsa_padding(Padding::PKCS1_PSS).map_err(|e| JoseError::Other(e.into()))?;
        signer
            .set_rsa_mgf1_md(digest)
            .map_err(|e| JoseError::Other(e.into()))?;
        signer
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .map_err(|e| JoseError::Other(e.into()))?;
    }
    signer.update(data).map_err(|e| JoseError::Other(e.into()))?;
    signer.sign_to_vec().map_err(|e| JoseError::Other(e.into()))
}

fn sign_ec(pkey: &openssl::ec::EcKey<Private>, digest: sha2::Sha2Variant, data: &[u8], coordinate_len: usize) -> JoseResult<Vec<u8>> {
    let hash = sha2::digest(digest, data);
    let sig = EcdsaSig::sign(&hash, pkey).map_err(|e| JoseError::Other(e.into()))?;
    let r = left_pad(&sig.r().to_vec(), coordinate_len);
    let s = left_pad(&sig.s().to_vec(), coordinate_len);
    let mut out = r;
    out.extend_from_slice(&s);
    Ok(out)
}

fn message_digest(alg: SignatureAlgorithm) -> MessageDigest {
    match alg.digest() {
        sha2::Sha2Variant::Sha256 => MessageDigest::sha256(),
        sha2::Sha2Variant::Sha384 => MessageDigest::sha384(),
        sha2::Sha2Variant::Sha512 => MessageDigest::sha512(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::sig;

    #[test]
    fn hmac_signer_produces_fixed_width_tag() {
        let jwk = Arc::new(Jwk::new_symmetric(b"0123456789abcdef0123456789abcdef".to_vec()));
        let signer = Signer::new(jwk, sig::HS256).unwrap();
        let tag = signer.sign(b"header.payload").unwrap();
        assert_eq!(tag.len(), 32);
    }

    #[test]
    fn rejects_mismatched_key_family() {
        let jwk = Arc::new(Jwk::new_symmetric(b"0123456789abcdef".to_vec()));
        let err = Signer::new(jwk, sig::RS256).unwrap_err();
        assert!(matches!(err, JoseError::HeaderInvalid(_)));
    }

    #[test]
    fn disposed_signer_refuses_to_sign() {
        let jwk = Arc::new(Jwk::new_symmetric(b"0123456789abcdef".to_vec()));
        let signer = Signer::new(jwk, sig::HS256).unwrap();
        signer.dispose();
        assert!(matches!(signer.sign(b"x"), Err(JoseError::Disposed)));
    }
}
