use crate::core::models::CanonicalPath;
use crate::core::scanner::{self, RequireCandidate};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type ScanKey = (CanonicalPath, blake3::Hash);

/// Scan results keyed by module path and content hash.
///
/// Entries are only ever inserted, so concurrent bundle runs can share one
/// cache: a changed file hashes differently and simply gets a new entry.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: DashMap<ScanKey, Arc<Vec<RequireCandidate>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&self, path: &CanonicalPath, source: &str) -> Arc<Vec<RequireCandidate>> {
        let key = (path.clone(), blake3::hash(source.as_bytes()));

        if let Some(hit) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(hit.value());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let scanned = Arc::new(scanner::scan(source));
        Arc::clone(self.entries.entry(key).or_insert(scanned).value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> ScanCacheStats {
        ScanCacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
