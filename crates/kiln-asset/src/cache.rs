//! Path-keyed asset cache with pluggable loaders and refcount-gated eviction

use crate::handle::{release_ref, AssetHandle};
use crate::types::{AssetKind, AssetStats};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default idle time before an unreferenced entry may be collected
pub const DEFAULT_UNUSED_TIMEOUT: Duration = Duration::from_secs(60);

/// What a loader hands back: a type-erased payload and its size in bytes
pub struct LoadedAsset {
    pub payload: Arc<dyn Any + Send + Sync>,
    pub size: usize,
}

impl LoadedAsset {
    pub fn new<T: Any + Send + Sync>(payload: T, size: usize) -> Self {
        Self {
            payload: Arc::new(payload),
            size,
        }
    }
}

type LoaderFn = Arc<dyn Fn(&str) -> Option<LoadedAsset> + Send + Sync>;

struct CacheEntry {
    payload: Arc<dyn Any + Send + Sync>,
    kind: AssetKind,
    size: usize,
    last_access: Instant,
    refs: Arc<AtomicUsize>,
    persistent: bool,
}

impl CacheEntry {
    fn collectable(&self) -> bool {
        !self.persistent && self.refs.load(Ordering::Acquire) == 0
    }
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    loaders: HashMap<AssetKind, LoaderFn>,
    current_size: usize,
    max_size: Option<usize>,
    unused_timeout: Duration,
}

impl CacheInner {
    fn remove(&mut self, path: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(path)?;
        self.current_size = self.current_size.saturating_sub(entry.size);
        Some(entry)
    }
}

/// Thread-safe asset cache.
///
/// All entry bookkeeping happens under one mutex. The load counters are
/// atomics updated outside it, and loader callbacks run with the lock
/// released so a slow loader never stalls other threads' cache hits.
pub struct AssetCache {
    inner: Mutex<CacheInner>,
    total_loads: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                loaders: HashMap::new(),
                current_size: 0,
                max_size: None,
                unused_timeout: DEFAULT_UNUSED_TIMEOUT,
            }),
            total_loads: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the loader for an asset kind, replacing any previous one
    pub fn register_loader<F>(&self, kind: AssetKind, loader: F)
    where
        F: Fn(&str) -> Option<LoadedAsset> + Send + Sync + 'static,
    {
        self.lock().loaders.insert(kind, Arc::new(loader));
    }

    /// Remove the loader for a kind; later misses for that kind yield `None`
    pub fn unregister_loader(&self, kind: AssetKind) -> bool {
        self.lock().loaders.remove(&kind).is_some()
    }

    pub fn set_unused_timeout(&self, timeout: Duration) {
        self.lock().unused_timeout = timeout;
    }

    pub fn unused_timeout(&self) -> Duration {
        self.lock().unused_timeout
    }

    /// Size budget in bytes enforced by `collect_garbage`; `None` disables it
    pub fn set_max_size(&self, max_size: Option<usize>) {
        self.lock().max_size = max_size;
    }

    pub fn max_size(&self) -> Option<usize> {
        self.lock().max_size
    }

    /// Load an asset, returning a shared handle.
    ///
    /// A hit bumps the entry's refcount and last-access time. A miss runs the
    /// registered loader for `kind`; a missing loader, a failed load or a
    /// payload of the wrong type caches nothing and returns `None`.
    pub fn load<T: Any + Send + Sync>(&self, path: &str, kind: AssetKind) -> Option<AssetHandle<T>> {
        let key = canonical_path(path)?;
        self.total_loads.fetch_add(1, Ordering::Relaxed);

        let loader = {
            let mut inner = self.lock();
            if let Some(entry) = inner.entries.get_mut(&key) {
                let Ok(payload) = entry.payload.clone().downcast::<T>() else {
                    self.cache_misses.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{} is cached as a different payload type", key);
                    return None;
                };
                entry.last_access = Instant::now();
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Some(AssetHandle::acquire(key.into(), payload, entry.refs.clone()));
            }
            inner.loaders.get(&kind).cloned()
        };

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let Some(loader) = loader else {
            log::warn!("No loader registered for {} assets ({})", kind.as_str(), key);
            return None;
        };
        let Some(loaded) = loader(&key) else {
            log::warn!("Failed to load {} asset: {}", kind.as_str(), key);
            return None;
        };
        let payload = match loaded.payload.clone().downcast::<T>() {
            Ok(p) => p,
            Err(_) => {
                log::warn!("Loader for {} returned an unexpected payload type", key);
                return None;
            }
        };

        let mut inner = self.lock();
        // Another thread may have finished the same load while the lock was released
        if let Some(entry) = inner.entries.get_mut(&key) {
            if let Ok(existing) = entry.payload.clone().downcast::<T>() {
                entry.last_access = Instant::now();
                return Some(AssetHandle::acquire(key.into(), existing, entry.refs.clone()));
            }
            return None;
        }

        let refs = Arc::new(AtomicUsize::new(0));
        inner.current_size += loaded.size;
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                payload: loaded.payload,
                kind,
                size: loaded.size,
                last_access: Instant::now(),
                refs: refs.clone(),
                persistent: false,
            },
        );
        log::debug!("Cached {} asset {} ({} bytes)", kind.as_str(), key, loaded.size);
        Some(AssetHandle::acquire(key.into(), payload, refs))
    }

    /// Pin an entry with an extra reference
    pub fn add_ref(&self, path: &str) -> bool {
        let Some(key) = canonical_path(path) else {
            return false;
        };
        let mut inner = self.lock();
        match inner.entries.get_mut(&key) {
            Some(entry) => {
                entry.refs.fetch_add(1, Ordering::AcqRel);
                entry.last_access = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drop one reference from an entry. The entry stays cached until a
    /// garbage-collection pass finds it unreferenced and idle.
    pub fn release(&self, path: &str) -> bool {
        let Some(key) = canonical_path(path) else {
            return false;
        };
        let inner = self.lock();
        inner
            .entries
            .get(&key)
            .map(|entry| release_ref(&entry.refs))
            .unwrap_or(false)
    }

    /// Mark an entry as exempt from eviction
    pub fn set_persistent(&self, path: &str, persistent: bool) -> bool {
        let Some(key) = canonical_path(path) else {
            return false;
        };
        match self.lock().entries.get_mut(&key) {
            Some(entry) => {
                entry.persistent = persistent;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        canonical_path(path)
            .map(|key| self.lock().entries.contains_key(&key))
            .unwrap_or(false)
    }

    /// Live reference count of an entry
    pub fn ref_count(&self, path: &str) -> Option<usize> {
        let key = canonical_path(path)?;
        self.lock()
            .entries
            .get(&key)
            .map(|entry| entry.refs.load(Ordering::Acquire))
    }

    pub fn kind_of(&self, path: &str) -> Option<AssetKind> {
        let key = canonical_path(path)?;
        self.lock().entries.get(&key).map(|entry| entry.kind)
    }

    /// Cached paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Evict idle, unreferenced entries using the current time
    pub fn collect_garbage(&self) -> usize {
        self.collect_garbage_at(Instant::now())
    }

    /// Evict every unreferenced, non-persistent entry idle for at least the
    /// unused timeout as of `now`. If a size budget is set and still
    /// exceeded, further unreferenced entries go in least-recently-used
    /// order until the cache fits. Returns the number of entries removed.
    pub fn collect_garbage_at(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let timeout = inner.unused_timeout;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.collectable() && now.saturating_duration_since(e.last_access) >= timeout)
            .map(|(k, _)| k.clone())
            .collect();
        let mut removed = 0;
        for key in expired {
            if inner.remove(&key).is_some() {
                log::debug!("Evicted idle asset {}", key);
                removed += 1;
            }
        }

        if let Some(max_size) = inner.max_size {
            if inner.current_size > max_size {
                let mut candidates: Vec<(Instant, String)> = inner
                    .entries
                    .iter()
                    .filter(|(_, e)| e.collectable())
                    .map(|(k, e)| (e.last_access, k.clone()))
                    .collect();
                candidates.sort();
                for (_, key) in candidates {
                    if inner.current_size <= max_size {
                        break;
                    }
                    if inner.remove(&key).is_some() {
                        log::debug!("Evicted asset {} to fit size budget", key);
                        removed += 1;
                    }
                }
            }
        }

        if removed > 0 {
            log::info!("Asset cache collected {} entries", removed);
        }
        removed
    }

    /// Drop every entry. Outstanding handles keep their payloads alive.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.current_size = 0;
    }

    pub fn stats(&self) -> AssetStats {
        let inner = self.lock();
        AssetStats {
            total_loads: self.total_loads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            entry_count: inner.entries.len(),
            current_size: inner.current_size,
        }
    }

    pub fn reset_stats(&self) {
        self.total_loads.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}

/// Normalize a path into a cache key: forward slashes, no empty or `.`
/// segments, `..` resolved lexically. Returns `None` for an empty path.
pub fn canonical_path(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unified = trimmed.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if absolute {
        Some(format!("/{}", joined))
    } else if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn cache_with_mesh_loader(calls: Arc<AtomicU32>) -> AssetCache {
        let cache = AssetCache::new();
        cache.register_loader(AssetKind::Mesh, move |path| {
            calls.fetch_add(1, Ordering::SeqCst);
            if path.contains("missing") {
                None
            } else {
                Some(LoadedAsset::new(path.to_string(), 100))
            }
        });
        cache
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("models\\hero.fbx").as_deref(), Some("models/hero.fbx"));
        assert_eq!(canonical_path("./a//b/../c.obj").as_deref(), Some("a/c.obj"));
        assert_eq!(canonical_path("/x/./y").as_deref(), Some("/x/y"));
        assert_eq!(canonical_path("../shared/t.png").as_deref(), Some("../shared/t.png"));
        assert_eq!(canonical_path("   "), None);
        assert_eq!(canonical_path(""), None);
    }

    #[test]
    fn test_hit_and_miss() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = cache_with_mesh_loader(calls.clone());

        let a = cache.load::<String>("meshes/box.obj", AssetKind::Mesh).unwrap();
        let b = cache.load::<String>("meshes/./box.obj", AssetKind::Mesh).unwrap();
        assert!(AssetHandle::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.ref_count(), 2);

        let stats = cache.stats();
        assert_eq!(stats.total_loads, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.current_size, 100);
    }

    #[test]
    fn test_loader_failure_caches_nothing() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        assert!(cache.load::<String>("missing.obj", AssetKind::Mesh).is_none());
        assert!(!cache.contains("missing.obj"));
        assert_eq!(cache.stats().cache_misses, 1);

        assert!(cache.load::<String>("a.png", AssetKind::Texture).is_none());
        assert!(cache.load::<String>("", AssetKind::Mesh).is_none());
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_wrong_type_returns_none() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        assert!(cache.load::<u64>("a.obj", AssetKind::Mesh).is_none());
        assert!(!cache.contains("a.obj"));
        let _h = cache.load::<String>("a.obj", AssetKind::Mesh).unwrap();
        assert!(cache.load::<u64>("a.obj", AssetKind::Mesh).is_none());

        let stats = cache.stats();
        assert_eq!(stats.total_loads, 3);
        assert_eq!(stats.cache_hits + stats.cache_misses, stats.total_loads);
        assert_eq!(stats.cache_hits, 0);
    }

    #[test]
    fn test_referenced_entry_survives_gc() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        cache.set_unused_timeout(Duration::ZERO);
        let handle = cache.load::<String>("keep.obj", AssetKind::Mesh).unwrap();

        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(cache.collect_garbage_at(later), 0);
        assert!(cache.contains("keep.obj"));

        drop(handle);
        assert_eq!(cache.ref_count("keep.obj"), Some(0));
        assert_eq!(cache.collect_garbage_at(later), 1);
        assert!(!cache.contains("keep.obj"));
        assert_eq!(cache.stats().current_size, 0);
    }

    #[test]
    fn test_gc_respects_timeout() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        drop(cache.load::<String>("idle.obj", AssetKind::Mesh));
        assert_eq!(cache.collect_garbage_at(Instant::now() + Duration::from_secs(10)), 0);
        assert_eq!(cache.collect_garbage_at(Instant::now() + Duration::from_secs(61)), 1);
    }

    #[test]
    fn test_add_ref_release_and_persistent() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        cache.set_unused_timeout(Duration::ZERO);
        drop(cache.load::<String>("pin.obj", AssetKind::Mesh));

        assert!(cache.add_ref("pin.obj"));
        assert_eq!(cache.ref_count("pin.obj"), Some(1));
        assert_eq!(cache.collect_garbage(), 0);
        assert!(cache.release("pin.obj"));
        assert!(!cache.release("pin.obj"));
        assert_eq!(cache.ref_count("pin.obj"), Some(0));

        assert!(cache.set_persistent("pin.obj", true));
        assert_eq!(cache.collect_garbage(), 0);
        cache.set_persistent("pin.obj", false);
        assert_eq!(cache.collect_garbage(), 1);
        assert!(!cache.add_ref("pin.obj"));
    }

    #[test]
    fn test_size_budget_evicts_lru() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        drop(cache.load::<String>("old.obj", AssetKind::Mesh));
        std::thread::sleep(Duration::from_millis(5));
        drop(cache.load::<String>("new.obj", AssetKind::Mesh));
        cache.set_max_size(Some(150));

        assert_eq!(cache.collect_garbage(), 1);
        assert!(!cache.contains("old.obj"));
        assert!(cache.contains("new.obj"));
        assert_eq!(cache.stats().current_size, 100);
    }

    #[test]
    fn test_concurrent_loads_share_entry() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = Arc::new(cache_with_mesh_loader(calls));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let h = cache.load::<String>("shared.obj", AssetKind::Mesh).unwrap();
                    h.len()
                })
            })
            .collect();
        for t in threads {
            assert_eq!(t.join().unwrap(), "shared.obj".len());
        }
        assert_eq!(cache.stats().entry_count, 1);
        assert_eq!(cache.stats().total_loads, 8);
        assert_eq!(cache.ref_count("shared.obj"), Some(0));
    }

    #[test]
    fn test_clear_and_reset_stats() {
        let cache = cache_with_mesh_loader(Arc::new(AtomicU32::new(0)));
        let handle = cache.load::<String>("a.obj", AssetKind::Mesh).unwrap();
        cache.clear();
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(handle.as_str(), "a.obj");
        cache.reset_stats();
        assert_eq!(cache.stats().total_loads, 0);
    }
}
