use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A user override for one exact URL string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistEntry {
    pub url: String,
    pub allowed: bool,
    pub created_at: i64,
    /// Unix seconds; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl AllowlistEntry {
    pub fn new(url: impl Into<String>, ttl: Option<Duration>) -> Self {
        let now = now_secs();
        Self {
            url: url.into(),
            allowed: true,
            created_at: now,
            expires_at: ttl.and_then(|ttl| expiry_after(now, ttl)),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_secs() >= exp,
            None => false,
        }
    }

    /// Truthy and not expired.
    pub fn is_active(&self) -> bool {
        self.allowed && !self.is_expired()
    }
}

/// Durable allowlist of URLs the user chose to visit despite a warning.
///
/// Matching is on the exact URL string; no origin or pattern matching.
pub trait AllowlistStore: Send + Sync {
    fn is_allowed(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Insert or refresh the entry. Calling it twice is equivalent to once.
    fn allow(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove the entry. Returns whether one existed.
    fn revoke(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<AllowlistEntry>>> + Send + '_>>;
}

/// Process-local allowlist, used for ephemeral runs and tests.
pub struct InMemoryAllowlist {
    entries: tokio::sync::RwLock<HashMap<String, AllowlistEntry>>,
    ttl: Option<Duration>,
}

impl InMemoryAllowlist {
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: tokio::sync::RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemoryAllowlist {
    fn default() -> Self {
        Self::new()
    }
}

impl AllowlistStore for InMemoryAllowlist {
    fn is_allowed(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            let store = self.entries.read().await;
            Ok(matches!(store.get(&url), Some(entry) if entry.is_active()))
        })
    }

    fn allow(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let entry = AllowlistEntry::new(url, self.ttl);
        Box::pin(async move {
            let mut store = self.entries.write().await;
            store.insert(entry.url.clone(), entry);
            Ok(())
        })
    }

    fn revoke(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            let mut store = self.entries.write().await;
            Ok(store.remove(&url).is_some())
        })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<AllowlistEntry>>> + Send + '_>> {
        Box::pin(async move {
            let store = self.entries.read().await;
            let mut entries: Vec<AllowlistEntry> = store.values().cloned().collect();
            entries.sort_by(|a, b| a.url.cmp(&b.url));
            Ok(entries)
        })
    }
}

fn expiry_after(now: i64, ttl: Duration) -> Option<i64> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
}

pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allow_and_check() {
        let allowlist = InMemoryAllowlist::new();
        assert!(!allowlist.is_allowed("http://evil.example/").await.unwrap());

        allowlist.allow("http://evil.example/").await.unwrap();
        assert!(allowlist.is_allowed("http://evil.example/").await.unwrap());
    }

    #[tokio::test]
    async fn test_exact_match_only() {
        let allowlist = InMemoryAllowlist::new();
        allowlist.allow("http://evil.example/").await.unwrap();

        assert!(!allowlist.is_allowed("http://evil.example/login").await.unwrap());
        assert!(!allowlist.is_allowed("http://evil.example").await.unwrap());
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let allowlist = InMemoryAllowlist::with_ttl(Some(Duration::from_secs(u64::MAX)));
        allowlist.allow("http://a.example/").await.unwrap();
        assert!(allowlist.is_allowed("http://a.example/").await.unwrap());

        let near_limit = AllowlistEntry::new("http://b.example/", Some(Duration::from_secs(i64::MAX as u64)));
        assert_eq!(near_limit.expires_at, None);
        assert!(near_limit.is_active());

        let hour = AllowlistEntry::new("http://c.example/", Some(Duration::from_secs(3600)));
        assert_eq!(hour.expires_at, Some(hour.created_at + 3600));
    }

    #[tokio::test]
    async fn test_allow_is_idempotent() {
        let allowlist = InMemoryAllowlist::new();
        allowlist.allow("http://a.example/").await.unwrap();
        allowlist.allow("http://a.example/").await.unwrap();

        let entries = allowlist.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "http://a.example/");
        assert!(entries[0].allowed);
    }

    #[tokio::test]
    async fn test_revoke() {
        let allowlist = InMemoryAllowlist::new();
        allowlist.allow("http://a.example/").await.unwrap();

        assert!(allowlist.revoke("http://a.example/").await.unwrap());
        assert!(!allowlist.revoke("http://a.example/").await.unwrap());
        assert!(!allowlist.is_allowed("http://a.example/").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let allowlist = InMemoryAllowlist::with_ttl(Some(Duration::from_secs(0)));
        allowlist.allow("http://a.example/").await.unwrap();
        assert!(!allowlist.is_allowed("http://a.example/").await.unwrap());
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = AllowlistEntry::new("http://a.example/", None);
        assert!(entry.is_active());
        assert_eq!(entry.expires_at, None);
    }
}
