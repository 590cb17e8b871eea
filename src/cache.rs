//! Expiring key-value cache used in front of the translation store.
//!
//! Entries are advisory: a miss is always resolvable from the store, so cache
//! faults degrade to misses instead of errors. Writes go through
//! `put_if_absent`, which never replaces a live entry.

use crate::models::{Locale, Translation};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// A value stored in the key-value cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedRecord {
    Locale(Locale),
    Translation(Translation),
}

impl CachedRecord {
    pub fn into_locale(self) -> Option<Locale> {
        match self {
            CachedRecord::Locale(locale) => Some(locale),
            CachedRecord::Translation(_) => None,
        }
    }

    pub fn into_translation(self) -> Option<Translation> {
        match self {
            CachedRecord::Translation(translation) => Some(translation),
            CachedRecord::Locale(_) => None,
        }
    }
}

/// Generic expiring cache capability.
pub trait KeyValueCache: Send + Sync {
    /// Check whether a live entry exists for the key
    fn has(&self, key: &str) -> bool;

    /// Get a live entry, or `None` if absent, expired, or the cache is unavailable
    fn get(&self, key: &str) -> Option<CachedRecord>;

    /// Store a value, replacing any existing entry
    fn put(&self, key: &str, value: CachedRecord, ttl: Duration);

    /// Store a value only if no live entry exists for the key.
    ///
    /// Returns `true` if the value was written.
    fn put_if_absent(&self, key: &str, value: CachedRecord, ttl: Duration) -> bool {
        if self.has(key) {
            return false;
        }
        self.put(key, value, ttl);
        true
    }
}

/// Cache key for a locale row
pub fn locale_key(code: &str) -> String {
    format!("locale:{}", code)
}

/// Cache key for a translation of `text` in the locale `code`.
///
/// Root rows (`parent_id == None`) and derived rows are keyed apart: a derived
/// row's key carries its parent id, so a root row whose text equals a parent's
/// text never shares an entry with the derived row. The text is hashed with
/// blake3 so keys stay short for long source strings.
pub fn translation_key(code: &str, text: &str, parent_id: Option<i64>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(code.as_bytes());
    hasher.update(b"\x1f");
    match parent_id {
        None => hasher.update(b"root"),
        Some(id) => hasher.update(b"derived").update(&id.to_le_bytes()),
    };
    hasher.update(b"\x1f");
    hasher.update(text.as_bytes());
    format!("translation:{}:{}", code, hasher.finalize().to_hex())
}

struct CacheEntry {
    value: CachedRecord,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }
}

/// In-process cache with per-entry TTL.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut map) = self.inner.lock() else {
            warn!("Translation cache lock poisoned, skipping purge");
            return 0;
        };
        let before = map.len();
        map.retain(|_, entry| entry.is_live());
        before - map.len()
    }
}

impl KeyValueCache for MemoryCache {
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<CachedRecord> {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(_) => {
                warn!(key, "Translation cache lock poisoned, treating as miss");
                return None;
            }
        };

        if let Some(entry) = map.get(key) {
            if entry.is_live() {
                return Some(entry.value.clone());
            }
            // Expired, drop it
            map.remove(key);
        }
        None
    }

    fn put(&self, key: &str, value: CachedRecord, ttl: Duration) {
        match self.inner.lock() {
            Ok(mut map) => {
                map.insert(
                    key.to_string(),
                    CacheEntry {
                        value,
                        inserted_at: Instant::now(),
                        ttl,
                    },
                );
            }
            Err(_) => warn!(key, "Translation cache lock poisoned, dropping write"),
        }
    }

    fn put_if_absent(&self, key: &str, value: CachedRecord, ttl: Duration) -> bool {
        let Ok(mut map) = self.inner.lock() else {
            warn!(key, "Translation cache lock poisoned, dropping write");
            return false;
        };

        if map.get(key).is_some_and(CacheEntry::is_live) {
            return false;
        }

        map.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30 * 60);

    fn locale(id: i64, code: &str) -> CachedRecord {
        CachedRecord::Locale(Locale {
            id,
            code: code.to_string(),
            name: "Test".to_string(),
            created_at: String::new(),
        })
    }

    // ==================== Key Tests ====================

    #[test]
    fn test_locale_key_format() {
        assert_eq!(locale_key("fr"), "locale:fr");
    }

    #[test]
    fn test_translation_key_embeds_code() {
        let key = translation_key("fr", "Hello", None);
        assert!(key.starts_with("translation:fr:"));
        // blake3 hex digest
        assert_eq!(key.len(), "translation:fr:".len() + 64);
    }

    #[test]
    fn test_translation_key_is_deterministic() {
        assert_eq!(
            translation_key("en", "Hello", Some(3)),
            translation_key("en", "Hello", Some(3))
        );
    }

    #[test]
    fn test_translation_key_distinguishes_text_and_locale() {
        assert_ne!(
            translation_key("en", "Hello", None),
            translation_key("en", "Hello ", None)
        );
        assert_ne!(
            translation_key("en", "Hello", None),
            translation_key("fr", "Hello", None)
        );
    }

    #[test]
    fn test_translation_key_separates_root_and_derived_rows() {
        let root = translation_key("fr", "Hello", None);
        let derived = translation_key("fr", "Hello", Some(1));

        assert_ne!(root, derived);
        assert_ne!(derived, translation_key("fr", "Hello", Some(2)));
    }

    #[test]
    fn test_translation_key_bounded_for_long_text() {
        let long_text = "lorem ipsum ".repeat(10_000);
        assert!(translation_key("en", &long_text, Some(i64::MAX)).len() < 100);
    }

    // ==================== MemoryCache Tests ====================

    #[test]
    fn test_get_missing_key() {
        let cache = MemoryCache::new();
        assert!(cache.get("locale:en").is_none());
        assert!(!cache.has("locale:en"));
    }

    #[test]
    fn test_put_then_get() {
        let cache = MemoryCache::new();
        cache.put("locale:en", locale(1, "en"), TTL);

        assert!(cache.has("locale:en"));
        let cached = cache.get("locale:en").unwrap().into_locale().unwrap();
        assert_eq!(cached.id, 1);
    }

    #[test]
    fn test_put_if_absent_does_not_overwrite() {
        let cache = MemoryCache::new();
        assert!(cache.put_if_absent("locale:en", locale(1, "en"), TTL));
        assert!(!cache.put_if_absent("locale:en", locale(2, "en"), TTL));

        let cached = cache.get("locale:en").unwrap().into_locale().unwrap();
        assert_eq!(cached.id, 1);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = MemoryCache::new();
        cache.put("locale:en", locale(1, "en"), TTL);
        cache.put("locale:en", locale(2, "en"), TTL);
        assert_eq!(cache.get("locale:en").unwrap().into_locale().unwrap().id, 2);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.put("locale:en", locale(1, "en"), Duration::ZERO);
        assert!(cache.get("locale:en").is_none());
        assert!(!cache.has("locale:en"));
    }

    #[test]
    fn test_put_if_absent_replaces_expired_entry() {
        let cache = MemoryCache::new();
        cache.put("locale:en", locale(1, "en"), Duration::ZERO);
        assert!(cache.put_if_absent("locale:en", locale(2, "en"), TTL));
        assert_eq!(cache.get("locale:en").unwrap().into_locale().unwrap().id, 2);
    }

    #[test]
    fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.put("a", locale(1, "en"), Duration::ZERO);
        cache.put("b", locale(2, "fr"), TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("b"));
    }

    #[test]
    fn test_record_variant_accessors() {
        assert!(locale(1, "en").into_translation().is_none());
        assert!(locale(1, "en").into_locale().is_some());
    }
}
