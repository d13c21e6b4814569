//! Process-lifetime caches of disposable cryptographic engines (C7/C8's
//! shared infrastructure).
//!
//! Building an `openssl::rsa::Rsa` or `openssl::ec::EcKey` handle from PEM
//! material is the expensive step in signing/verification; everything
//! downstream of that (one RSA-PKCS1 signature, one ECDSA verification) is
//! comparatively cheap. [`Factory`] memoizes the expensive handle behind a
//! [`CryptoCacheKey`] so repeated operations against the same [`crate::jwk::Jwk`]
//! + algorithm pair reuse it, and [`ObjectPool`] lets an engine that is not
//! `Send`-safe to share across threads be checked out exclusively instead.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Identifies a cached engine by the identity of the key it was built from
/// plus the packed id of the algorithm it operates under. Two [`crate::jwk::Jwk`]
/// instances with byte-identical material still get distinct entries,
/// since [`crate::jwk::Jwk::identity`] is a construction-order counter, not a
/// content hash — this avoids a cache collision silently handing one
/// caller's engine to another caller's differently-scoped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CryptoCacheKey {
    pub key_identity: u64,
    pub algorithm_id: u16,
}

impl CryptoCacheKey {
    /// `algorithm_id` is `u16` rather than the single-byte algorithm ids
    /// most registries use, since C8's JWE side packs two ids together —
    /// `(enc_id << 8) | kw_id` — to distinguish e.g. `A128GCM` wrapped via
    /// `A128KW` from `A256GCM` wrapped via the same `A128KW`.
    pub fn new(key_identity: u64, algorithm_id: u16) -> CryptoCacheKey {
        CryptoCacheKey { key_identity, algorithm_id }
    }
}

/// A concurrent `CryptoCacheKey -> Arc<T>` cache with last-writer-loses
/// resolution: if two threads race to build the same entry, both builds run
/// and whichever finishes last wins the slot, but both callers get a valid,
/// usable `Arc<T>` either way (their own build, or the one that replaced
/// it). No caller observes a half-built entry because the lock is held only
/// for the hashmap mutation, never across the (slow) build.
pub struct Factory<T> {
    entries: Mutex<HashMap<CryptoCacheKey, Arc<T>>>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Factory {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Factory<T> {
    pub fn new() -> Factory<T> {
        Factory::default()
    }

    /// Return the cached engine for `key`, or build one with `build` and
    /// cache it. `build` may run concurrently with another thread's `build`
    /// for the same key; both results are valid, the cache just keeps one.
    pub fn get_or_create<E>(
        &self,
        key: CryptoCacheKey,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(existing) = self.entries.lock().unwrap().get(&key) {
            log::trace!("cache hit for key_identity={} algorithm_id={}", key.key_identity, key.algorithm_id);
            return Ok(existing.clone());
        }
        log::debug!("building cache entry for key_identity={} algorithm_id={}", key.key_identity, key.algorithm_id);
        let built = Arc::new(build()?);
        let mut guard = self.entries.lock().unwrap();
        let slot = guard.entry(key).or_insert_with(|| built.clone());
        Ok(slot.clone())
    }

    /// Evict a single entry, e.g. when its backing `Jwk` is dropped.
    pub fn evict(&self, key: &CryptoCacheKey) {
        if self.entries.lock().unwrap().remove(key).is_some() {
            log::debug!("evicted cache entry for key_identity={} algorithm_id={}", key.key_identity, key.algorithm_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fixed-shape pool of reusable, not-`Sync` engine handles (most
/// OpenSSL context types fall in this bucket). [`ObjectPool::acquire`]
/// blocks-free: it either pops an idle handle or calls `build` to make a
/// fresh one, and returns a [`PooledHandle`] that returns the handle to the
/// pool on drop, including on an early return or panic-driven unwind out of
/// the caller's scope.
#[derive(Debug)]
pub struct ObjectPool<T> {
    idle: Mutex<Vec<T>>,
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        ObjectPool { idle: Mutex::new(Vec::new()) }
    }
}

impl<T> ObjectPool<T> {
    pub fn new() -> ObjectPool<T> {
        ObjectPool::default()
    }

    pub fn acquire<E>(self: &Arc<Self>, build: impl FnOnce() -> Result<T, E>) -> Result<PooledHandle<T>, E> {
        let existing = self.idle.lock().unwrap().pop();
        let value = match existing {
            Some(v) => v,
            None => build()?,
        };
        Ok(PooledHandle {
            pool: self.clone(),
            value: Some(value),
        })
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }
}

/// A checked-out pool entry. Dropping it (including via an unwinding panic)
/// returns the handle to its pool rather than discarding it.
pub struct PooledHandle<T> {
    pool: Arc<ObjectPool<T>>,
    value: Option<T>,
}

impl<T> std::ops::Deref for PooledHandle<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value taken only on drop")
    }
}

impl<T> std::ops::DerefMut for PooledHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value taken only on drop")
    }
}

impl<T> Drop for PooledHandle<T> {
    fn drop(&mut self) {
        if let Some(v) = self.value.take() {
            self.pool.idle.lock().unwrap().push(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn factory_caches_by_key() {
        let factory: Factory<u32> = Factory::new();
        let builds = AtomicUsize::new(0);
        let key = CryptoCacheKey::new(1, 0);
        let a = factory
            .get_or_create::<std::convert::Infallible>(key, || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap();
        let b = factory
            .get_or_create::<std::convert::Infallible>(key, || {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .unwrap();
        assert_eq!(*a, 7);
        assert_eq!(*b, 7);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_distinguishes_keys() {
        let factory: Factory<u32> = Factory::new();
        let a = factory
            .get_or_create::<std::convert::Infallible>(CryptoCacheKey::new(1, 0), || Ok(1))
            .unwrap();
        let b = factory
            .get_or_create::<std::convert::Infallible>(CryptoCacheKey::new(2, 0), || Ok(2))
            .unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn pool_reuses_returned_handles() {
        let pool: Arc<ObjectPool<u32>> = Arc::new(ObjectPool::new());
        let builds = AtomicUsize::new(0);
        {
            let _h = pool
                .acquire::<std::convert::Infallible>(|| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .unwrap();
        }
        assert_eq!(pool.idle_count(), 1);
        {
            let _h = pool
                .acquire::<std::convert::Infallible>(|| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(2)
                })
                .unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_returns_handle_after_panic_unwind() {
        let pool: Arc<ObjectPool<u32>> = Arc::new(ObjectPool::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _h = pool.acquire::<std::convert::Infallible>(|| Ok(1)).unwrap();
            panic!("simulated failure mid-use");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle_count(), 1);
    }
}
