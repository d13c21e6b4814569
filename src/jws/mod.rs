//! JSON Web Signature: the signing/verification operation objects (C7) and
//! the factories that cache them by `(key, algorithm)`.

mod signer;
mod verifier;

pub use signer::Signer;
pub use verifier::Verifier;

use crate::alg::SignatureAlgorithm;
use crate::cache::{CryptoCacheKey, Factory};
use crate::error::JoseResult;
use crate::jwk::Jwk;
use std::sync::Arc;

/// Caches [`Signer`]s by `(Jwk, SignatureAlgorithm)` so repeated signing
/// against the same key reuses its RSA/EC engine instead of rebuilding one
/// per call.
#[derive(Default)]
pub struct SignerFactory {
    cache: Factory<Signer>,
}

impl SignerFactory {
    pub fn new() -> SignerFactory {
        SignerFactory::default()
    }

    pub fn get(&self, key: &Arc<Jwk>, alg: SignatureAlgorithm) -> JoseResult<Arc<Signer>> {
        let cache_key = CryptoCacheKey::new(key.identity(), alg.id as u16);
        self.cache.get_or_create(cache_key, || Signer::new(key.clone(), alg))
    }
}

#[derive(Default)]
pub struct VerifierFactory {
    cache: Factory<Verifier>,
}

impl VerifierFactory {
    pub fn new() -> VerifierFactory {
        VerifierFactory::default()
    }

    pub fn get(&self, key: &Arc<Jwk>, alg: SignatureAlgorithm) -> JoseResult<Arc<Verifier>> {
        let cache_key = CryptoCacheKey::new(key.identity(), alg.id as u16);
        self.cache.get_or_create(cache_key, || Verifier::new(key.clone(), alg))
    }
}
