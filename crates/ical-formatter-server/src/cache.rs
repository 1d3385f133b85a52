//! Raw source text cache keyed by URL.
//!
//! Only the fetched text is cached. Each request parses it again, so a
//! transformed document is never shared between requests or profiles.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

struct Entry {
    text: String,
    inserted: Instant,
}

/// Entries expire `ttl` after insertion. When full, expired entries are
/// purged first and then the oldest insertion is evicted. A cache with
/// `max_entries == 0` stores nothing.
pub struct SourceCache {
    ttl: Duration,
    entries: Option<Mutex<LruCache<String, Entry>>>,
}

impl SourceCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            entries: NonZeroUsize::new(max_entries).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Fresh text for `url`, if any. Lookups do not refresh recency.
    pub fn get(&self, url: &str) -> Option<String> {
        let entries = self.entries.as_ref()?.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .peek(url)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| entry.text.clone())
    }

    pub fn insert(&self, url: &str, text: String) {
        let Some(entries) = &self.entries else {
            return;
        };
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains(url) && entries.len() >= entries.cap().get() {
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.inserted.elapsed() >= self.ttl)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                entries.pop(key);
            }
        }

        let entry = Entry {
            text,
            inserted: Instant::now(),
        };
        if let Some((evicted, _)) = entries.push(url.to_string(), entry) {
            if evicted != url {
                tracing::debug!(url = %evicted, "evicting cached source");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| {
            entries.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
