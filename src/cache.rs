//! Content-addressed derivative cache.
//!
//! Generating a derivative means a full decode of the source image, which
//! for a camera JPEG can take hundreds of milliseconds. This module stores
//! every generated derivative on disk so later requests are a file read.
//!
//! # Design
//!
//! ## Cache keys
//!
//! A [`CacheKey`] is the SHA-256 of everything that determines a
//! derivative's bytes: the cache directory, the resolved source path, the
//! maximum dimension, and the crop mode. The crop mode is part of the key so
//! Fit and Square derivatives of the same source never collide. Keys are a
//! pure function of their inputs, so they are stable across restarts.
//!
//! Keys are never stored; they are recomputed per request.
//!
//! ## Storage
//!
//! One file per key in the cache directory, named `{hex}.jpg`. Existence is
//! authoritative: there is no content verification and no freshness check
//! against the source. Editing a source image in place does not invalidate
//! its derivatives; delete the cache directory (or the affected files) to
//! force regeneration. The service never deletes cache files.
//!
//! Entries are written to a temporary file in the cache directory and renamed
//! into place, so a reader sees either no file or the complete file.
//!
//! ## Concurrency
//!
//! For any key, at most one generation runs at a time. The first request to
//! miss becomes the *leader* and registers an in-flight slot; requests that
//! miss while the slot exists block on it and receive the leader's bytes (or
//! its error). The slot is removed once the leader has persisted and
//! published its result, so the registry only ever holds keys that are
//! actively being generated.
//!
//! A failed persist (disk full, read-only cache dir) is logged and the
//! generated bytes are still returned; the next request simply regenerates.

use crate::imaging::{CropMode, ResizeError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// File extension of cached derivatives (always JPEG).
pub const CACHE_EXTENSION: &str = "jpg";

/// Domain separator so keys cannot collide with other SHA-256 uses.
const KEY_DOMAIN: &[u8] = b"proofsheet-derivative\0";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read cache entry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Generate(Arc<ResizeError>),
}

/// Fixed-width opaque identifier for a derivative (64 lowercase hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a (source, dimension, crop mode) triple.
    ///
    /// `source` should be the canonical absolute path produced by the
    /// resolver so equivalent request paths share a key.
    pub fn derive(cache_dir: &Path, source: &Path, max_dim: u32, crop: CropMode) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(cache_dir.as_os_str().as_encoded_bytes());
        hasher.update(b"\0");
        hasher.update(source.as_os_str().as_encoded_bytes());
        hasher.update(b"\0");
        hasher.update(max_dim.to_le_bytes());
        hasher.update([crop.tag()]);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Cache file name: `{hex}.jpg`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, CACHE_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a fetch was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read from an existing cache file.
    Hit,
    /// Generated by this request.
    Generated,
    /// Waited on another request's generation.
    Joined,
}

/// Bytes returned by [`DerivativeCache::fetch`].
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Arc<Vec<u8>>,
    pub origin: Origin,
}

type SharedResult = Result<Arc<Vec<u8>>, Arc<ResizeError>>;

/// A generation in progress that other requests can wait on.
struct InFlight {
    result: Mutex<Option<SharedResult>>,
    cv: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn set(&self, result: SharedResult) {
        let mut slot = lock(&self.result);
        *slot = Some(result);
        self.cv.notify_all();
    }

    fn wait(&self) -> SharedResult {
        let mut slot = lock(&self.result);
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self.cv.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Lock ignoring poisoning: the protected data is a plain map or slot that
/// stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Cache counters, updated concurrently by request handlers.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    generated: AtomicU64,
    joined: AtomicU64,
    failed: AtomicU64,
}

impl CacheStats {
    fn record(&self, origin: Origin) {
        let counter = match origin {
            Origin::Hit => &self.hits,
            Origin::Generated => &self.generated,
            Origin::Joined => &self.joined,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn fail(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.generated() + self.joined() + self.failed()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.hits() + self.joined();
        if cached > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                cached,
                self.generated(),
                self.total()
            )?;
        } else {
            write!(f, "{} generated", self.generated())?;
        }
        if self.failed() > 0 {
            write!(f, ", {} failed", self.failed())?;
        }
        Ok(())
    }
}

/// On-disk derivative store with per-key generation coordination.
pub struct DerivativeCache {
    dir: PathBuf,
    in_flight: Mutex<HashMap<CacheKey, Arc<InFlight>>>,
    stats: CacheStats,
}

impl DerivativeCache {
    /// Open (creating if needed) the cache directory.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            in_flight: Mutex::new(HashMap::new()),
            stats: CacheStats::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Derive a key for this cache's directory.
    pub fn key(&self, source: &Path, max_dim: u32, crop: CropMode) -> CacheKey {
        CacheKey::derive(&self.dir, source, max_dim, crop)
    }

    /// Location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Number of keys currently being generated.
    pub fn in_flight_len(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Return the bytes for `key`, generating and persisting them on a miss.
    ///
    /// `generate` runs at most once per key at a time across all callers.
    pub fn fetch<F>(&self, key: &CacheKey, generate: F) -> Result<Fetched, CacheError>
    where
        F: FnOnce() -> Result<Vec<u8>, ResizeError>,
    {
        let result = self.fetch_inner(key, generate);
        match &result {
            Ok(fetched) => self.stats.record(fetched.origin),
            Err(_) => self.stats.fail(),
        }
        result
    }

    fn fetch_inner<F>(&self, key: &CacheKey, generate: F) -> Result<Fetched, CacheError>
    where
        F: FnOnce() -> Result<Vec<u8>, ResizeError>,
    {
        let path = self.entry_path(key);

        if let Some(bytes) = self.lookup(&path)? {
            debug!("Cache hit {}", key);
            return Ok(Fetched {
                bytes: Arc::new(bytes),
                origin: Origin::Hit,
            });
        }

        let (flight, is_leader) = self.join_in_flight(key);
        if !is_leader {
            debug!("Waiting on in-flight generation {}", key);
            return flight
                .wait()
                .map(|bytes| Fetched {
                    bytes,
                    origin: Origin::Joined,
                })
                .map_err(CacheError::Generate);
        }

        let mut guard = LeaderGuard {
            cache: self,
            key,
            flight: &flight,
            done: false,
        };

        // A previous leader may have persisted between our lookup and joining.
        let (result, origin) = match self.lookup(&path) {
            Ok(Some(bytes)) => (Ok(Arc::new(bytes)), Origin::Hit),
            Ok(None) => {
                let result = generate().map(Arc::new).map_err(Arc::new);
                if let Ok(bytes) = &result {
                    self.persist(key, &path, bytes);
                }
                (result, Origin::Generated)
            }
            Err(e) => {
                guard.finish(Err(Arc::new(ResizeError::Io(io::Error::other(
                    "cache lookup failed",
                )))));
                return Err(e);
            }
        };

        guard.finish(result.clone());
        result
            .map(|bytes| Fetched { bytes, origin })
            .map_err(CacheError::Generate)
    }

    /// Read an entry if it exists.
    fn lookup(&self, path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn join_in_flight(&self, key: &CacheKey) -> (Arc<InFlight>, bool) {
        let mut map = lock(&self.in_flight);
        if let Some(existing) = map.get(key) {
            return (Arc::clone(existing), false);
        }
        let flight = Arc::new(InFlight::new());
        map.insert(key.clone(), Arc::clone(&flight));
        (flight, true)
    }

    fn finish_in_flight(&self, key: &CacheKey, flight: &InFlight, result: SharedResult) {
        flight.set(result);
        lock(&self.in_flight).remove(key);
    }

    /// Persist atomically; failures are logged, never returned.
    fn persist(&self, key: &CacheKey, path: &Path, bytes: &[u8]) {
        if let Err(e) = write_atomic(&self.dir, path, bytes) {
            warn!(
                "Failed to cache {} at {}: {}; serving uncached",
                key,
                path.display(),
                e
            );
        }
    }
}

/// Publishes the leader's result and clears the in-flight slot, including
/// when `generate` panics, so waiters never block forever.
struct LeaderGuard<'a> {
    cache: &'a DerivativeCache,
    key: &'a CacheKey,
    flight: &'a InFlight,
    done: bool,
}

impl LeaderGuard<'_> {
    fn finish(&mut self, result: SharedResult) {
        self.cache.finish_in_flight(self.key, self.flight, result);
        self.done = true;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            let err = ResizeError::Io(io::Error::other("derivative generation panicked"));
            self.cache
                .finish_in_flight(self.key, self.flight, Err(Arc::new(err)));
        }
    }
}

/// Write to a temp file in `dir`, then rename onto `path`.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::DerivativeSpec;
    use crate::imaging::engine::tests::MockEngine;
    use crate::imaging::ResizeEngine;
    use std::fs;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    fn spec(source: &str, max_dim: u32, crop: CropMode) -> DerivativeSpec {
        DerivativeSpec {
            source: source.into(),
            max_dim,
            crop,
        }
    }

    fn fetch_spec(
        cache: &DerivativeCache,
        engine: &MockEngine,
        spec: &DerivativeSpec,
    ) -> Result<Fetched, CacheError> {
        let key = cache.key(&spec.source, spec.max_dim, spec.crop);
        cache.fetch(&key, || engine.generate(spec))
    }

    fn cache_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    // =========================================================================
    // CacheKey
    // =========================================================================

    #[test]
    fn key_is_deterministic() {
        let a = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Square);
        let b = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Square);
        assert_eq!(a, b);
        assert_eq!(a.as_hex().len(), 64);
        assert!(a.as_hex().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_is_pinned() {
        // Changing the encoding orphans every existing cache file.
        let a = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Square);
        let mut hasher = Sha256::new();
        hasher.update(b"proofsheet-derivative\0/c\0/p/a.jpg\0");
        hasher.update(100u32.to_le_bytes());
        hasher.update(b"S");
        assert_eq!(a.as_hex(), format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn key_separates_crop_modes() {
        let fit = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Fit);
        let square = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Square);
        assert_ne!(fit, square);
    }

    #[test]
    fn key_varies_with_every_input() {
        let base = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Fit);
        assert_ne!(base, CacheKey::derive(Path::new("/d"), Path::new("/p/a.jpg"), 100, CropMode::Fit));
        assert_ne!(base, CacheKey::derive(Path::new("/c"), Path::new("/p/b.jpg"), 100, CropMode::Fit));
        assert_ne!(base, CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 480, CropMode::Fit));
    }

    #[test]
    fn key_has_no_concatenation_ambiguity() {
        // "/p/a.jpg" + 1100 must not equal "/p/a.jpg1" + 100
        let a = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 1100, CropMode::Fit);
        let b = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg1"), 100, CropMode::Fit);
        assert_ne!(a, b);
    }

    #[test]
    fn key_file_name_has_jpg_extension() {
        let key = CacheKey::derive(Path::new("/c"), Path::new("/p/a.jpg"), 100, CropMode::Fit);
        assert_eq!(key.file_name(), format!("{}.jpg", key.as_hex()));
    }

    // =========================================================================
    // fetch: hit / miss / persist
    // =========================================================================

    #[test]
    fn miss_generates_and_persists() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::new();
        let s = spec("/p/a.jpg", 100, CropMode::Square);

        let fetched = fetch_spec(&cache, &engine, &s).unwrap();
        assert_eq!(fetched.origin, Origin::Generated);
        assert_eq!(*fetched.bytes, MockEngine::expected_bytes(&s));

        let key = cache.key(&s.source, s.max_dim, s.crop);
        assert_eq!(fs::read(cache.entry_path(&key)).unwrap(), *fetched.bytes);
    }

    #[test]
    fn second_fetch_is_hit_without_generation() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::new();
        let s = spec("/p/a.jpg", 100, CropMode::Square);

        let first = fetch_spec(&cache, &engine, &s).unwrap();
        let files_after_first = cache_files(tmp.path());
        let second = fetch_spec(&cache, &engine, &s).unwrap();

        assert_eq!(second.origin, Origin::Hit);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(engine.call_count(), 1);
        assert_eq!(cache_files(tmp.path()), files_after_first);
    }

    #[test]
    fn existing_file_is_authoritative() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let key = cache.key(Path::new("/p/a.jpg"), 100, CropMode::Fit);
        fs::write(cache.entry_path(&key), b"stale but trusted").unwrap();

        let fetched = cache
            .fetch(&key, || panic!("must not generate on hit"))
            .unwrap();
        assert_eq!(*fetched.bytes, b"stale but trusted");
    }

    #[test]
    fn fit_and_square_produce_separate_files() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::new();

        fetch_spec(&cache, &engine, &spec("/p/a.jpg", 100, CropMode::Fit)).unwrap();
        fetch_spec(&cache, &engine, &spec("/p/a.jpg", 100, CropMode::Square)).unwrap();

        assert_eq!(engine.call_count(), 2);
        assert_eq!(cache_files(tmp.path()).len(), 2);
    }

    #[test]
    fn generation_error_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::failing();
        let s = spec("/p/a.jpg", 100, CropMode::Fit);

        let err = fetch_spec(&cache, &engine, &s).unwrap_err();
        assert!(matches!(err, CacheError::Generate(_)));
        assert!(cache_files(tmp.path()).is_empty());
        assert_eq!(cache.in_flight_len(), 0);
        assert_eq!(cache.stats().failed(), 1);
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::new();
        fetch_spec(&cache, &engine, &spec("/p/a.jpg", 100, CropMode::Fit)).unwrap();

        let files = cache_files(tmp.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".jpg"));
        assert!(!files[0].starts_with(".tmp-"));
    }

    #[test]
    fn persist_failure_still_returns_bytes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cache");
        let cache = DerivativeCache::open(&dir).unwrap();
        let engine = MockEngine::new();
        let s = spec("/p/a.jpg", 100, CropMode::Fit);
        let key = cache.key(&s.source, s.max_dim, s.crop);

        // Swap the directory for a plain file mid-generation so the write
        // fails regardless of who runs the test.
        let fetched = cache
            .fetch(&key, || {
                fs::remove_dir(&dir).unwrap();
                fs::write(&dir, b"not a directory").unwrap();
                engine.generate(&s)
            })
            .unwrap();

        assert_eq!(fetched.origin, Origin::Generated);
        assert_eq!(*fetched.bytes, MockEngine::expected_bytes(&s));
        assert!(!cache.entry_path(&key).exists());
        assert_eq!(fs::read(&dir).unwrap(), b"not a directory");
        assert_eq!(cache.in_flight_len(), 0);
        assert_eq!(cache.stats().failed(), 0);
    }

    #[test]
    fn open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/cache");
        DerivativeCache::open(&dir).unwrap();
        assert!(dir.is_dir());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[test]
    fn concurrent_misses_generate_once() {
        const N: usize = 8;
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::slow(Duration::from_millis(100));
        let s = spec("/p/a.jpg", 100, CropMode::Square);
        let barrier = Barrier::new(N);

        let results: Vec<Fetched> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..N)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        fetch_spec(&cache, &engine, &s).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(engine.call_count(), 1);
        assert!(results.iter().all(|r| r.bytes == results[0].bytes));
        assert_eq!(
            results.iter().filter(|r| r.origin == Origin::Generated).count(),
            1
        );
        assert_eq!(cache.in_flight_len(), 0);
        assert_eq!(cache_files(tmp.path()).len(), 1);
    }

    #[test]
    fn concurrent_failure_reaches_all_waiters() {
        const N: usize = 4;
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine {
            delay: Some(Duration::from_millis(100)),
            fail: true,
            ..MockEngine::default()
        };
        let s = spec("/p/a.jpg", 100, CropMode::Fit);
        let barrier = Barrier::new(N);

        let errors = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..N)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        fetch_spec(&cache, &engine, &s).is_err()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|failed| *failed)
                .count()
        });

        assert_eq!(errors, N);
        assert_eq!(engine.call_count(), 1);
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[test]
    fn distinct_keys_generate_in_parallel() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::slow(Duration::from_millis(50));

        std::thread::scope(|scope| {
            for name in ["/p/a.jpg", "/p/b.jpg", "/p/c.jpg"] {
                let (cache, engine) = (&cache, &engine);
                scope.spawn(move || {
                    fetch_spec(cache, engine, &spec(name, 100, CropMode::Fit)).unwrap();
                });
            }
        });

        assert_eq!(engine.call_count(), 3);
        assert_eq!(cache_files(tmp.path()).len(), 3);
    }

    #[test]
    fn panicking_leader_releases_waiters() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let key = cache.key(Path::new("/p/a.jpg"), 100, CropMode::Fit);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = cache.fetch(&key, || panic!("decoder blew up"));
        }));
        assert!(outcome.is_err());
        assert_eq!(cache.in_flight_len(), 0);

        // The key is usable again afterwards.
        let fetched = cache.fetch(&key, || Ok(b"ok".to_vec())).unwrap();
        assert_eq!(fetched.origin, Origin::Generated);
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn stats_count_hits_and_generations() {
        let tmp = TempDir::new().unwrap();
        let cache = DerivativeCache::open(tmp.path()).unwrap();
        let engine = MockEngine::new();
        let s = spec("/p/a.jpg", 100, CropMode::Fit);

        fetch_spec(&cache, &engine, &s).unwrap();
        fetch_spec(&cache, &engine, &s).unwrap();
        fetch_spec(&cache, &engine, &s).unwrap();

        assert_eq!(cache.stats().hits(), 2);
        assert_eq!(cache.stats().generated(), 1);
        assert_eq!(cache.stats().to_string(), "2 cached, 1 generated (3 total)");
    }

    #[test]
    fn stats_display_no_hits() {
        let stats = CacheStats::default();
        stats.record(Origin::Generated);
        stats.record(Origin::Generated);
        assert_eq!(stats.to_string(), "2 generated");
    }

    #[test]
    fn stats_display_with_failures() {
        let stats = CacheStats::default();
        stats.record(Origin::Hit);
        stats.record(Origin::Generated);
        stats.fail();
        assert_eq!(stats.to_string(), "1 cached, 1 generated (3 total), 1 failed");
    }
}
