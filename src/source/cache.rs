//! Per-fingerprint cache of virtual graphs.

use crate::config::CacheConfig;
use crate::properties::{keys, OptionSet};
use crate::source::BufferedTripleSource;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a virtual graph: two calls with equal fingerprints request
/// the same triples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    location: String,
    options: OptionSet,
    triplifier: String,
}

impl Fingerprint {
    /// Options that only address the resource, or do not change the emitted
    /// triples, are left out of the option part.
    pub fn new(location: impl Into<String>, options: &OptionSet, triplifier: impl Into<String>) -> Self {
        let mut options = options.clone();
        for key in [keys::LOCATION, keys::FROM_ARCHIVE, keys::AUDIT] {
            options.remove(key);
        }
        Self { location: location.into(), options, triplifier: triplifier.into() }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn triplifier(&self) -> &str {
        &self.triplifier
    }

    /// IRI naming the virtual graph, stable for equal fingerprints.
    pub fn graph_id(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("urn:facade-x:graph:{:016x}", hasher.finish())
    }
}

struct Entry {
    source: Arc<BufferedTripleSource>,
    last_used: u64,
}

/// Cache of [`BufferedTripleSource`]s keyed by [`Fingerprint`].
///
/// With a capacity, the least recently used entry is evicted on insert, but
/// never one that is still materializing, being scanned, or referenced
/// from outside the cache.
pub struct VirtualGraphCache {
    capacity: Option<usize>,
    entries: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    map: HashMap<Fingerprint, Entry>,
    clock: u64,
}

impl VirtualGraphCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self { capacity: config.max_entries, entries: Mutex::new(CacheState::default()) }
    }

    /// The cached source for `fingerprint`, created with `create` on a miss.
    /// The flag is true when this call created it.
    pub fn get_or_insert_with(
        &self,
        fingerprint: &Fingerprint,
        create: impl FnOnce() -> BufferedTripleSource,
    ) -> (Arc<BufferedTripleSource>, bool) {
        let mut state = self.entries.lock();
        state.clock += 1;
        let now = state.clock;

        if let Some(entry) = state.map.get_mut(fingerprint) {
            entry.last_used = now;
            tracing::debug!(graph = %entry.source.id(), "virtual graph cache hit");
            return (Arc::clone(&entry.source), false);
        }

        if let Some(capacity) = self.capacity {
            while state.map.len() >= capacity.max(1) {
                if !Self::evict_one(&mut state) {
                    tracing::warn!(entries = state.map.len(), capacity, "cache full, every entry in use");
                    break;
                }
            }
        }

        let source = Arc::new(create());
        tracing::debug!(graph = %source.id(), "virtual graph cache miss");
        state.map.insert(fingerprint.clone(), Entry { source: Arc::clone(&source), last_used: now });
        (source, true)
    }

    fn evict_one(state: &mut CacheState) -> bool {
        let victim = state
            .map
            .iter()
            .filter(|(_, entry)| Arc::strong_count(&entry.source) == 1 && !entry.source.is_in_use())
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(fingerprint, _)| fingerprint.clone());
        match victim {
            Some(fingerprint) => {
                if let Some(entry) = state.map.remove(&fingerprint) {
                    tracing::debug!(graph = %entry.source.id(), "virtual graph evicted");
                }
                true
            }
            None => false,
        }
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<BufferedTripleSource>> {
        self.entries.lock().map.get(fingerprint).map(|entry| Arc::clone(&entry.source))
    }

    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<Arc<BufferedTripleSource>> {
        self.entries.lock().map.remove(fingerprint).map(|entry| entry.source)
    }

    /// Remove `fingerprint` only if it still maps to `source`.
    pub fn remove_source(&self, fingerprint: &Fingerprint, source: &Arc<BufferedTripleSource>) -> bool {
        let mut state = self.entries.lock();
        match state.map.get(fingerprint) {
            Some(entry) if Arc::ptr_eq(&entry.source, source) => {
                state.map.remove(fingerprint);
                true
            }
            _ => false,
        }
    }

    /// Every cached source, ordered by graph id.
    pub fn sources(&self) -> Vec<Arc<BufferedTripleSource>> {
        let mut sources: Vec<_> =
            self.entries.lock().map.values().map(|entry| Arc::clone(&entry.source)).collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        sources
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().map.clear();
    }
}

impl Default for VirtualGraphCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
