//! OID name resolution.
//!
//! Numeric OIDs are translated to `MIB::name` pairs by an external
//! [`Translate`] implementation (normally [`SnmpTranslate`], which runs
//! net-snmp's `snmptranslate`). [`OidCache`] memoizes successful
//! translations behind the [`Resolve`] trait.
//!
//! # Locking
//!
//! The cache holds one async lock for the whole of a miss, including the
//! external call. Misses are therefore serialized: N concurrent lookups of an
//! uncached OID run the translator exactly once, and unrelated lookups wait
//! while a miss is in flight.

mod snmptranslate;

pub use snmptranslate::{SnmpTranslate, parse_translate_output};

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::ResolveError;

/// A resolved OID: the defining MIB module and the symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MibEntry {
    /// MIB module name, e.g. `IF-MIB`
    pub mib_name: String,
    /// Symbolic name, e.g. `linkDown` or `ifIndex.2`
    pub oid_text: String,
}

impl MibEntry {
    /// Create an entry.
    pub fn new(mib_name: impl Into<String>, oid_text: impl Into<String>) -> Self {
        Self {
            mib_name: mib_name.into(),
            oid_text: oid_text.into(),
        }
    }
}

impl std::fmt::Display for MibEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.mib_name, self.oid_text)
    }
}

/// Translate one dotted-decimal OID to a [`MibEntry`].
///
/// Implementations may be slow (a process spawn per call); callers are
/// expected to cache.
pub trait Translate: Send + Sync + 'static {
    /// Translate `oid` (leading-dot numeric form).
    fn translate(&self, oid: &str) -> impl Future<Output = Result<MibEntry, ResolveError>> + Send;
}

/// Cached resolution of OIDs, as consumed by the normalizer.
pub trait Resolve: Send + Sync + 'static {
    /// Resolve `oid`, translating it on a miss.
    ///
    /// Failures are never cached.
    fn resolve(&self, oid: &str) -> impl Future<Output = Result<MibEntry, ResolveError>> + Send;

    /// Drop every cached entry.
    fn clear(&self) -> impl Future<Output = ()> + Send;

    /// Insert an entry without translating.
    fn preload(&self, oid: &str, entry: MibEntry) -> impl Future<Output = ()> + Send;
}

struct CacheState {
    entries: HashMap<String, MibEntry>,
    // Insertion order, only tracked when bounded
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl CacheState {
    fn insert(&mut self, oid: &str, entry: MibEntry) {
        if self.entries.insert(oid.to_string(), entry).is_some() {
            return;
        }
        let Some(capacity) = self.capacity else {
            return;
        };
        self.order.push_back(oid.to_string());
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(target: "async_snmp_trap::resolve", { snmp.oid = %oldest }, "evicted cache entry");
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Memoizing resolver over a [`Translate`] implementation.
///
/// Unbounded by default. With [`with_capacity`](Self::with_capacity) the
/// oldest inserted entry is evicted once the bound is exceeded.
///
/// ```no_run
/// use std::time::Duration;
/// use async_snmp_trap::resolve::{OidCache, Resolve, SnmpTranslate};
///
/// # async fn example() -> Result<(), async_snmp_trap::ResolveError> {
/// let cache = OidCache::new(SnmpTranslate::new(Duration::from_secs(5)));
/// let entry = cache.resolve(".1.3.6.1.6.3.1.1.5.3").await?;
/// assert_eq!(entry.oid_text, "linkDown");
/// # Ok(())
/// # }
/// ```
pub struct OidCache<T> {
    translator: T,
    state: Mutex<CacheState>,
}

impl<T: Translate> OidCache<T> {
    /// Create an unbounded cache.
    pub fn new(translator: T) -> Self {
        Self::build(translator, None)
    }

    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero caches nothing.
    pub fn with_capacity(translator: T, capacity: usize) -> Self {
        Self::build(translator, Some(capacity))
    }

    fn build(translator: T, capacity: Option<usize>) -> Self {
        Self {
            translator,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// The wrapped translator.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }
}

impl<T: Translate> Resolve for OidCache<T> {
    #[instrument(level = "debug", skip_all, err(level = "debug"), fields(snmp.oid = %oid))]
    async fn resolve(&self, oid: &str) -> Result<MibEntry, ResolveError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.entries.get(oid) {
            return Ok(entry.clone());
        }

        // Held across the translation: misses are serialized
        let entry = self.translator.translate(oid).await?;
        tracing::debug!(target: "async_snmp_trap::resolve", { snmp.oid = %oid, mib = %entry.mib_name, name = %entry.oid_text }, "translated OID");
        state.insert(oid, entry.clone());
        Ok(entry)
    }

    async fn clear(&self) {
        self.state.lock().await.clear();
    }

    async fn preload(&self, oid: &str, entry: MibEntry) {
        self.state.lock().await.insert(oid, entry);
    }
}

impl<T> std::fmt::Debug for OidCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Canned {
        calls: AtomicUsize,
    }

    impl Translate for Canned {
        async fn translate(&self, oid: &str) -> Result<MibEntry, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            match oid {
                ".1.3.6.1.6.3.1.1.5.3" => Ok(MibEntry::new("IF-MIB", "linkDown")),
                ".1.3.6.1.6.3.1.1.5.4" => Ok(MibEntry::new("IF-MIB", "linkUp")),
                ".1.3.6.1.2.1.2.2.1.1.2" => Ok(MibEntry::new("IF-MIB", "ifIndex.2")),
                _ => Err(ResolveError::NotFound { oid: oid.into() }),
            }
        }
    }

    impl Canned {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let cache = OidCache::new(Canned::default());
        let a = cache.resolve(".1.3.6.1.6.3.1.1.5.3").await.unwrap();
        let b = cache.resolve(".1.3.6.1.6.3.1.1.5.3").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.oid_text, "linkDown");
        assert_eq!(cache.translator().calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let cache = OidCache::new(Canned::default());
        assert!(matches!(
            cache.resolve(".9.9").await,
            Err(ResolveError::NotFound { .. })
        ));
        assert!(cache.resolve(".9.9").await.is_err());
        assert_eq!(cache.translator().calls(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_misses_translate_once() {
        let cache = Arc::new(OidCache::new(Canned::default()));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let cache = cache.clone();
            tasks.spawn(async move { cache.resolve(".1.3.6.1.6.3.1.1.5.4").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap().oid_text, "linkUp");
        }
        assert_eq!(cache.translator().calls(), 1);
    }

    #[tokio::test]
    async fn test_preload_and_clear() {
        let cache = OidCache::new(Canned::default());
        cache
            .preload(".1.2.3", MibEntry::new("TEST-MIB", "testTrap"))
            .await;
        assert_eq!(
            cache.resolve(".1.2.3").await.unwrap(),
            MibEntry::new("TEST-MIB", "testTrap")
        );
        assert_eq!(cache.translator().calls(), 0);

        cache.clear().await;
        assert!(cache.resolve(".1.2.3").await.is_err());
        assert_eq!(cache.translator().calls(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = OidCache::with_capacity(Canned::default(), 2);
        cache.preload(".1", MibEntry::new("A", "a")).await;
        cache.preload(".2", MibEntry::new("B", "b")).await;
        cache.preload(".3", MibEntry::new("C", "c")).await;
        assert_eq!(cache.len().await, 2);

        // .1 was evicted and is not translatable
        assert!(cache.resolve(".1").await.is_err());
        assert_eq!(cache.resolve(".3").await.unwrap().oid_text, "c");
    }

    #[tokio::test]
    async fn test_preload_existing_key_does_not_grow_order() {
        let cache = OidCache::with_capacity(Canned::default(), 2);
        cache.preload(".1", MibEntry::new("A", "a")).await;
        cache.preload(".1", MibEntry::new("A", "a2")).await;
        cache.preload(".2", MibEntry::new("B", "b")).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.resolve(".1").await.unwrap().oid_text, "a2");
    }

    #[tokio::test]
    async fn test_zero_capacity_caches_nothing() {
        let cache = OidCache::with_capacity(Canned::default(), 0);
        cache.resolve(".1.3.6.1.6.3.1.1.5.3").await.unwrap();
        cache.resolve(".1.3.6.1.6.3.1.1.5.3").await.unwrap();
        assert_eq!(cache.translator().calls(), 2);
    }

    #[test]
    fn test_mib_entry_display() {
        assert_eq!(MibEntry::new("IF-MIB", "linkUp").to_string(), "IF-MIB::linkUp");
    }
}
