use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use pipecheck_types::{DEFAULT_TARGET_POINTER, Environment, ProcessorTargets};
use tracing::debug;

use super::{ProcessorResolver, ProcessorsProvider, ProviderError, ResolvedProcessors};

/// Memoization key of a resolution.
///
/// Targets keep their declaration order because it decides the order of the
/// resolved processors. The environment is a sorted map, so variable order in
/// a definition file does not produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub targets: Vec<String>,
    pub environment: Environment,
}

impl CacheKey {
    pub fn new(targets: &ProcessorTargets, environment: &Environment) -> Self {
        Self {
            targets: targets.iter().map(str::to_string).collect(),
            environment: environment.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.targets.is_empty() {
            f.write_str(DEFAULT_TARGET_POINTER)?;
        } else {
            f.write_str(&self.targets.join(","))?;
        }
        write!(f, " ({} env vars)", self.environment.len())
    }
}

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of times the underlying resolver ran.
    pub resolutions: usize,
    /// Number of lookups answered from the cache.
    pub hits: usize,
}

/// Memoizing provider over any [`ProcessorResolver`].
///
/// Entries are only ever added, never evicted, for the lifetime of a run. The
/// executor populates every key a parallel run needs before any case starts,
/// so during fan-out every lookup is a hit.
pub struct CachedProvider<R> {
    resolver: R,
    entries: Mutex<HashMap<CacheKey, Arc<ResolvedProcessors>>>,
    resolutions: AtomicUsize,
    hits: AtomicUsize,
}

impl<R> fmt::Debug for CachedProvider<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedProvider").field("stats", &self.stats()).finish()
    }
}

impl<R> CachedProvider<R> {
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }
}

impl<R: ProcessorResolver> CachedProvider<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn lookup(&self, key: &CacheKey) -> Result<Option<Arc<ResolvedProcessors>>, ProviderError> {
        let entries = self.entries.lock().map_err(|_| ProviderError::CachePoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: CacheKey, resolved: ResolvedProcessors) -> Result<Arc<ResolvedProcessors>, ProviderError> {
        let mut entries = self.entries.lock().map_err(|_| ProviderError::CachePoisoned)?;
        // A concurrent first population may have stored the key already; keep
        // the first value so every caller sees the same entry.
        let entry = entries.entry(key).or_insert_with(|| Arc::new(resolved));
        Ok(Arc::clone(entry))
    }
}

impl<R: ProcessorResolver> ProcessorsProvider for CachedProvider<R> {
    fn resolve(&self, targets: &ProcessorTargets, environment: &Environment) -> Result<Arc<ResolvedProcessors>, ProviderError> {
        let key = CacheKey::new(targets, environment);
        if let Some(resolved) = self.lookup(&key)? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(cache_key = %key, processor_count = resolved.len(), "processors cache hit");
            return Ok(resolved);
        }

        debug!(cache_key = %key, "processors cache miss");
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let resolved = self.resolver.resolve_uncached(targets, environment)?;
        self.store(key, resolved)
    }
}
