use crate::domain::ScanVerdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Stand-in deadline when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Internal cache entry. `generation` ties the entry to the one expiry task
/// allowed to remove it.
struct CacheEntry {
    verdict: ScanVerdict,
    expires_at: Instant,
    generation: u64,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-wide map from URL to its latest scan verdict.
///
/// Entries live for a fixed TTL with no refresh on hit. Each `put` spawns a
/// single expiry task keyed by a fresh generation number, so re-scanning a URL
/// before its old timer fires cannot evict the newer entry. The map is bounded
/// by `capacity`; when full, expired entries are purged first and then the
/// entry closest to expiry is dropped.
pub struct VerdictCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
    next_generation: AtomicU64,
    ttl: Duration,
    capacity: usize,
}

impl VerdictCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Live verdict for the exact URL, if any.
    pub async fn get(&self, url: &str) -> Option<ScanVerdict> {
        let store = self.data.read().await;
        match store.get(url) {
            Some(entry) if !entry.is_expired() => Some(entry.verdict.clone()),
            _ => None,
        }
    }

    /// Store a verdict and schedule its removal after the TTL.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn put(&self, url: &str, verdict: ScanVerdict) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let entry = CacheEntry {
            verdict,
            expires_at: expiry_deadline(self.ttl),
            generation,
        };

        {
            let mut store = self.data.write().await;
            if !store.contains_key(url) && store.len() >= self.capacity {
                make_room(&mut store, self.capacity);
            }
            store.insert(url.to_string(), entry);
        }

        let data = Arc::clone(&self.data);
        let key = url.to_string();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut store = data.write().await;
            if store.get(&key).is_some_and(|e| e.generation == generation) {
                store.remove(&key);
                tracing::trace!(url = %key, "verdict cache entry expired");
            }
        });
    }

    pub async fn remove(&self, url: &str) -> bool {
        let mut store = self.data.write().await;
        store.remove(url).is_some()
    }

    /// Number of stored entries, including expired ones not yet collected.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.data.write().await.clear();
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

fn expiry_deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn make_room(store: &mut HashMap<String, CacheEntry>, capacity: usize) {
    store.retain(|_, entry| !entry.is_expired());
    while store.len() >= capacity {
        let oldest = store
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                store.remove(&key);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_put_and_get() {
        let cache = VerdictCache::default();
        cache.put("http://a.example/", ScanVerdict::safe()).await;

        assert_eq!(cache.get("http://a.example/").await, Some(ScanVerdict::safe()));
        assert_eq!(cache.get("http://b.example/").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = VerdictCache::new(Duration::from_secs(300), 16);
        cache.put("http://a.example/", ScanVerdict::safe()).await;

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(cache.get("http://a.example/").await.is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(cache.get("http://a.example/").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_entry_survives_old_timer() {
        let cache = VerdictCache::new(Duration::from_secs(300), 16);
        cache.put("http://a.example/", ScanVerdict::safe()).await;

        tokio::time::sleep(Duration::from_secs(200)).await;
        cache
            .put("http://a.example/", ScanVerdict::unsafe_because("malware"))
            .await;

        // First timer fires at t=300 but belongs to the old generation.
        tokio::time::sleep(Duration::from_secs(150)).await;
        let verdict = cache.get("http://a.example/").await.unwrap();
        assert!(!verdict.safe);
        assert_eq!(cache.len().await, 1);

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(cache.get("http://a.example/").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_entry_closest_to_expiry() {
        let cache = VerdictCache::new(Duration::from_secs(300), 2);
        cache.put("http://1.example/", ScanVerdict::safe()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        cache.put("http://2.example/", ScanVerdict::safe()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        cache.put("http://3.example/", ScanVerdict::safe()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("http://1.example/").await.is_none());
        assert!(cache.get("http://2.example/").await.is_some());
        assert!(cache.get("http://3.example/").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict_when_full() {
        let cache = VerdictCache::new(Duration::from_secs(300), 1);
        cache.put("http://1.example/", ScanVerdict::safe()).await;
        cache
            .put("http://1.example/", ScanVerdict::unsafe_because("phishing"))
            .await;

        assert_eq!(cache.len().await, 1);
        assert!(!cache.get("http://1.example/").await.unwrap().safe);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = VerdictCache::new(Duration::MAX, 4);
        cache.put("http://a.example/", ScanVerdict::safe()).await;

        tokio::time::sleep(Duration::from_secs(86_400)).await;
        assert_eq!(cache.get("http://a.example/").await, Some(ScanVerdict::safe()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_and_clear() {
        let cache = VerdictCache::default();
        cache.put("http://a.example/", ScanVerdict::safe()).await;
        cache.put("http://b.example/", ScanVerdict::safe()).await;

        assert!(cache.remove("http://a.example/").await);
        assert!(!cache.remove("http://a.example/").await);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
