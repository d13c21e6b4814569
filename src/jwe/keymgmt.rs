//! CEK wrap/unwrap dispatch (C8): the `alg` side of JWE. Each
//! [`crate::alg::KeyManagementAlgorithm`] maps onto one of AES-KW,
//! AES-GCM-KW, RSA-OAEP/RSA1_5, or ECDH-ES (optionally key-wrapping the
//! derived key encryption key).
//!
//! [`KeyWrapperFactory`] and [`EncryptorFactory`] cache the long-lived
//! operation object each algorithm family needs, keyed by [`CryptoCacheKey`]
//! with the packed `(enc_id << 8) | alg_id` id section 4.6 calls for, so
//! repeated wrap/unwrap calls against the same key reuse the converted
//! OpenSSL/raw-key engine instead of rebuilding it every call — the C8
//! counterpart to [`crate::jws`]'s `SignerFactory`/`VerifierFactory` at C7.

use crate::aes::{gcm, kw};
use crate::alg::{EncryptionAlgorithm, KeyManagementAlgorithm};
use crate::cache::{CryptoCacheKey, Factory};
use crate::error::{JoseError, JoseResult};
use crate::jwe::{concat_kdf, ecdh_es, rsa_oaep};
use crate::jwk::{EcCurve, Jwk, KeyMaterial};
use crate::keyconv;
use openssl::ec::EcKey;
use openssl::pkey::{PKey, Private, Public};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Header fields a key-management algorithm may need to add/read, beyond
/// the wrapped key itself (`ek`).
#[derive(Debug, Clone, Default)]
pub struct KeyManagementParams {
    pub epk: Option<Jwk>,
    pub apu: Option<Vec<u8>>,
    pub apv: Option<Vec<u8>>,
    pub iv: Option<[u8; 12]>,
    pub tag: Option<[u8; 16]>,
}

/// `(enc_id << 8) | alg_id`: distinguishes a cached engine for, say,
/// `A128KW` wrapping an `A128GCM` CEK from the same static key's `A128KW`
/// engine wrapping an `A256GCM` CEK, even though the `alg` side is
/// identical in both — section 4.6's packed id.
fn packed_id(enc: EncryptionAlgorithm, alg: KeyManagementAlgorithm) -> u16 {
    ((enc.id as u16) << 8) | (alg.id as u16)
}

/// A long-lived AES key-wrap/unwrap engine for `A*KW`/`A*GCMKW`: the
/// symmetric key extracted once from the [`Jwk`] material rather than
/// re-read on every `wrap`/`unwrap` call.
pub struct KeyWrapper {
    kek: Zeroizing<Vec<u8>>,
}

impl KeyWrapper {
    fn build(key: &Jwk) -> JoseResult<KeyWrapper> {
        Ok(KeyWrapper { kek: Zeroizing::new(symmetric_bytes(key)?) })
    }

    fn wrap(&self, alg: KeyManagementAlgorithm, cek: &Zeroizing<Vec<u8>>, params: &mut KeyManagementParams) -> JoseResult<Vec<u8>> {
        if alg.is_aes_gcm_kw() {
            let iv = random_iv();
            let (wrapped, tag) = gcm::encrypt(&self.kek, &iv, cek, b"")?;
            params.iv = Some(iv);
            params.tag = Some(tag);
            return Ok(wrapped);
        }
        kw::wrap(&self.kek, cek)
    }

    fn unwrap(&self, alg: KeyManagementAlgorithm, ek: &[u8], params: &KeyManagementParams) -> JoseResult<Zeroizing<Vec<u8>>> {
        if alg.is_aes_gcm_kw() {
            let iv = params.iv.ok_or_else(|| JoseError::HeaderInvalid("AxxxGCMKW requires an iv header".into()))?;
            let tag = params.tag.ok_or_else(|| JoseError::HeaderInvalid("AxxxGCMKW requires a tag header".into()))?;
            let cek = gcm::decrypt(&self.kek, &iv, ek, b"", &tag)?.ok_or(JoseError::InvalidTag)?;
            return Ok(Zeroizing::new(cek));
        }
        Ok(Zeroizing::new(kw::unwrap(&self.kek, ek)?))
    }
}

/// Caches [`KeyWrapper`]s by `(Jwk, enc, alg)` for the `A*KW`/`A*GCMKW`
/// family.
#[derive(Default)]
pub struct KeyWrapperFactory {
    cache: Factory<KeyWrapper>,
}

impl KeyWrapperFactory {
    pub fn new() -> KeyWrapperFactory {
        KeyWrapperFactory::default()
    }

    fn get(&self, key: &Jwk, enc: EncryptionAlgorithm, alg: KeyManagementAlgorithm) -> JoseResult<Arc<KeyWrapper>> {
        let cache_key = CryptoCacheKey::new(key.identity(), packed_id(enc, alg));
        self.cache.get_or_create(cache_key, || KeyWrapper::build(key))
    }
}

/// A long-lived engine for the algorithm families whose key conversion —
/// RSA bignums, EC curve points — is the expensive step: RSA-OAEP/RSA1_5
/// wrap+unwrap, and ECDH-ES agreement.
enum EncryptorKind {
    Rsa {
        public: PKey<Public>,
        private: Option<PKey<Private>>,
    },
    Ecdh {
        curve: EcCurve,
        public: EcKey<Public>,
        private: Option<EcKey<Private>>,
    },
}

pub struct Encryptor {
    kind: EncryptorKind,
}

impl Encryptor {
    fn build(key: &Jwk, alg: KeyManagementAlgorithm) -> JoseResult<Encryptor> {
        let kind = if alg.is_rsa() {
            let public = PKey::from_rsa(keyconv::rsa_public_from_jwk(key)?).map_err(|e| JoseError::Other(e.into()))?;
            let private = match keyconv::rsa_private_from_jwk(key) {
                Ok(rsa) => Some(PKey::from_rsa(rsa).map_err(|e| JoseError::Other(e.into()))?),
                Err(_) => None,
            };
            EncryptorKind::Rsa { public, private }
        } else {
            let curve = match &key.material {
                KeyMaterial::Ec { curve, .. } => *curve,
                _ => return Err(JoseError::HeaderInvalid("ECDH-ES requires an EC key".into())),
            };
            let public = keyconv::ec_public_from_jwk(key)?;
            let private = keyconv::ec_private_from_jwk(key).ok();
            EncryptorKind::Ecdh { curve, public, private }
        };
        Ok(Encryptor { kind })
    }

    fn wrap(&self, alg: KeyManagementAlgorithm, cek: &Zeroizing<Vec<u8>>) -> JoseResult<Vec<u8>> {
        match &self.kind {
            EncryptorKind::Rsa { public, .. } => rsa_oaep::wrap(alg, public, cek),
            EncryptorKind::Ecdh { .. } => unreachable!("ECDH-ES key delivery goes through derive_for_wrap"),
        }
    }

    fn unwrap(&self, alg: KeyManagementAlgorithm, ek: &[u8]) -> JoseResult<Zeroizing<Vec<u8>>> {
        match &self.kind {
            EncryptorKind::Rsa { private, .. } => {
                let private = private.as_ref().ok_or_else(|| JoseError::HeaderInvalid("RSA unwrap requires a private key".into()))?;
                Ok(Zeroizing::new(rsa_oaep::unwrap(alg, private, ek)?))
            }
            EncryptorKind::Ecdh { .. } => unreachable!("ECDH-ES key delivery goes through derive_for_unwrap"),
        }
    }

    /// Writer side of ECDH-ES: generate a fresh ephemeral key against the
    /// cached recipient public key and return the shared secret; the
    /// generated `epk` is written into `params` for the header.
    fn derive_for_wrap(&self, params: &mut KeyManagementParams) -> JoseResult<Vec<u8>> {
        match &self.kind {
            EncryptorKind::Ecdh { curve, public, .. } => {
                let agreement = ecdh_es::agree_ephemeral_with(*curve, public)?;
                params.epk = Some(agreement.epk_public);
                Ok(agreement.shared_secret)
            }
            EncryptorKind::Rsa { .. } => unreachable!("RSA key delivery goes through wrap/unwrap"),
        }
    }

    /// Reader side of ECDH-ES: derive the shared secret between the
    /// cached static private key and the sender's `epk`.
    fn derive_for_unwrap(&self, epk: &Jwk) -> JoseResult<Vec<u8>> {
        match &self.kind {
            EncryptorKind::Ecdh { private, .. } => {
                let private = private.as_ref().ok_or_else(|| JoseError::HeaderInvalid("ECDH-ES requires a static private key".into()))?;
                ecdh_es::agree_static_with(private, epk)
            }
            EncryptorKind::Rsa { .. } => unreachable!("RSA key delivery goes through wrap/unwrap"),
        }
    }
}

/// Caches [`Encryptor`]s by `(Jwk, enc, alg)` for the RSA and ECDH-ES
/// families.
#[derive(Default)]
pub struct EncryptorFactory {
    cache: Factory<Encryptor>,
}

impl EncryptorFactory {
    pub fn new() -> EncryptorFactory {
        EncryptorFactory::default()
    }

    fn get(&self, key: &Jwk, enc: EncryptionAlgorithm, alg: KeyManagementAlgorithm) -> JoseResult<Arc<Encryptor>> {
        let cache_key = CryptoCacheKey::new(key.identity(), packed_id(enc, alg));
        self.cache.get_or_create(cache_key, || Encryptor::build(key, alg))
    }
}

/// Writer side for `dir`/`ECDH-ES`: the content-encryption key is
/// determined by the key-management step itself rather than generated
/// beforehand. For `dir` this is just the key's raw bytes; for `ECDH-ES`
/// it's Concat-KDF run over a freshly agreed ephemeral shared secret.
pub fn direct_cek(
    encryptors: &EncryptorFactory,
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    key: &Jwk,
    params: &mut KeyManagementParams,
) -> JoseResult<Zeroizing<Vec<u8>>> {
    if alg.name == "ECDH-ES" {
        let encryptor = encryptors.get(key, enc, alg)?;
        let shared_secret = encryptor.derive_for_wrap(params)?;
        let apu = params.apu.clone().unwrap_or_default();
        let apv = params.apv.clone().unwrap_or_default();
        let cek = concat_kdf::derive(&shared_secret, enc.name, &apu, &apv, (enc.cek_size() * 8) as u32);
        return Ok(Zeroizing::new(cek));
    }
    symmetric_bytes(key).map(Zeroizing::new)
}

/// Writer side for every wrapped-delivery algorithm: wrap a freshly
/// generated `cek` and return the `ek` bytes (plus, for ECDH-ES+AxxxKW and
/// AxxxGCMKW, the header fields `params` gains along the way).
pub fn wrap_cek(
    wrappers: &KeyWrapperFactory,
    encryptors: &EncryptorFactory,
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    key: &Jwk,
    cek: &Zeroizing<Vec<u8>>,
    params: &mut KeyManagementParams,
) -> JoseResult<Vec<u8>> {
    if alg.is_ecdh() {
        let encryptor = encryptors.get(key, enc, alg)?;
        let shared_secret = encryptor.derive_for_wrap(params)?;
        let apu = params.apu.clone().unwrap_or_default();
        let apv = params.apv.clone().unwrap_or_default();

        let kek_bits = (alg.wrapping_key_bytes().expect("+AxxxKW variant") * 8) as u32;
        let kek = concat_kdf::derive(&shared_secret, alg.name, &apu, &apv, kek_bits);
        return kw::wrap(&kek, cek);
    }

    if alg.is_aes_kw() || alg.is_aes_gcm_kw() {
        let wrapper = wrappers.get(key, enc, alg)?;
        return wrapper.wrap(alg, cek, params);
    }

    if alg.is_rsa() {
        let encryptor = encryptors.get(key, enc, alg)?;
        return encryptor.wrap(alg, cek);
    }

    unreachable!("dir has no wrapped delivery; callers must use direct_cek")
}

/// Reader side: recover the CEK from the wrapped-key bytes (or directly
/// from `key`/the ECDH-ES agreement).
pub fn unwrap_cek(
    wrappers: &KeyWrapperFactory,
    encryptors: &EncryptorFactory,
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    key: &Jwk,
    ek: &[u8],
    params: &KeyManagementParams,
) -> JoseResult<Zeroizing<Vec<u8>>> {
    if alg.is_ecdh() {
        let encryptor = encryptors.get(key, enc, alg)?;
        let epk = params
            .epk
            .as_ref()
            .ok_or_else(|| JoseError::HeaderInvalid("ECDH-ES requires an epk header".into()))?;
        let shared_secret = encryptor.derive_for_unwrap(epk)?;
        let apu = params.apu.clone().unwrap_or_default();
        let apv = params.apv.clone().unwrap_or_default();

        if alg.name == "ECDH-ES" {
            let cek = concat_kdf::derive(&shared_secret, enc.name, &apu, &apv, (enc.cek_size() * 8) as u32);
            return Ok(Zeroizing::new(cek));
        }

        let kek_bits = (alg.wrapping_key_bytes().expect("+AxxxKW variant") * 8) as u32;
        let kek = concat_kdf::derive(&shared_secret, alg.name, &apu, &apv, kek_bits);
        let cek = kw::unwrap(&kek, ek)?;
        return Ok(Zeroizing::new(cek));
    }

    if alg.is_aes_kw() || alg.is_aes_gcm_kw() {
        let wrapper = wrappers.get(key, enc, alg)?;
        return wrapper.unwrap(alg, ek, params);
    }

    if alg.is_rsa() {
        let encryptor = encryptors.get(key, enc, alg)?;
        return encryptor.unwrap(alg, ek);
    }

    // `dir`.
    symmetric_bytes(key).map(Zeroizing::new)
}

fn symmetric_bytes(key: &Jwk) -> JoseResult<Vec<u8>> {
    match &key.material {
        KeyMaterial::Symmetric { k } => Ok(k.to_vec()),
        _ => Err(JoseError::HeaderInvalid("expected a symmetric key".into())),
    }
}

fn random_iv() -> [u8; 12] {
    use rand::RngCore;
    let mut iv = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}
