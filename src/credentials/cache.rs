//! Bounded cache for remote-secret payloads.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

/// Key under which the last fetched remote-secret payload is stored.
pub const ACCOUNT_DATA_KEY: &str = "account_data";

/// Default capacity, sized for a handful of accounts per process.
pub const DEFAULT_CAPACITY: usize = 10;

/// Key/value store shared by the credential sources of one or more resolvers.
pub trait SecretCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
}

/// [`SecretCache`] backed by an LRU with a fixed entry count.
pub struct LruSecretCache {
    inner: Mutex<LruCache<String, String>>,
}

impl LruSecretCache {
    /// Creates a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LruSecretCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SecretCache for LruSecretCache {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key.to_string(), value);
    }
}

static SHARED: LazyLock<Arc<LruSecretCache>> =
    LazyLock::new(|| Arc::new(LruSecretCache::default()));

/// The process-wide cache used by [`CredentialResolver::from_environment`].
///
/// [`CredentialResolver::from_environment`]: super::CredentialResolver::from_environment
pub fn shared_cache() -> Arc<dyn SecretCache> {
    SHARED.clone()
}
