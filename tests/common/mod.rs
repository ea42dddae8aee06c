#![allow(dead_code)]

use navguard::abstractions::{AllowlistEntry, AllowlistStore, Scanner, TabControl};
use navguard::domain::{Badge, ScanVerdict, Vote};
use navguard::error::{GuardError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scanner answering from a fixed table; unknown URLs are safe.
#[derive(Default)]
pub struct ScriptedScanner {
    verdicts: HashMap<String, Result<ScanVerdict>>,
    delay: Duration,
    calls: AtomicUsize,
    reports: Mutex<Vec<(String, Vote)>>,
}

impl ScriptedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn verdict(mut self, url: &str, verdict: ScanVerdict) -> Self {
        self.verdicts.insert(url.to_string(), Ok(verdict));
        self
    }

    pub fn failure(mut self, url: &str, message: &str) -> Self {
        self.verdicts
            .insert(url.to_string(), Err(GuardError::Network(message.to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<(String, Vote)> {
        self.reports.lock().unwrap().clone()
    }
}

impl Scanner for ScriptedScanner {
    fn scan(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<ScanVerdict>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .verdicts
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(ScanVerdict::safe()));
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn report(&self, url: &str, vote: Vote) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.reports.lock().unwrap().push((url.to_string(), vote));
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEffect {
    Redirect(i64, String),
    Badge(i64, Badge),
}

#[derive(Default)]
pub struct RecordingTabs {
    effects: Mutex<Vec<TabEffect>>,
}

impl RecordingTabs {
    pub fn effects(&self) -> Vec<TabEffect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> Vec<TabEffect> {
        self.effects()
            .into_iter()
            .filter(|effect| matches!(effect, TabEffect::Redirect(..)))
            .collect()
    }
}

impl TabControl for RecordingTabs {
    fn redirect(&self, tab_id: i64, url: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.effects
            .lock()
            .unwrap()
            .push(TabEffect::Redirect(tab_id, url.to_string()));
        Box::pin(async { Ok(()) })
    }

    fn set_badge(&self, tab_id: i64, badge: Badge) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.effects.lock().unwrap().push(TabEffect::Badge(tab_id, badge));
        Box::pin(async { Ok(()) })
    }
}

/// Allowlist whose storage is unavailable: every call fails.
#[derive(Default)]
pub struct BrokenAllowlist {
    lookups: AtomicUsize,
}

impl BrokenAllowlist {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn unavailable() -> GuardError {
        GuardError::Storage("database is locked".to_string())
    }
}

impl AllowlistStore for BrokenAllowlist {
    fn is_allowed(&self, _url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(Self::unavailable()) })
    }

    fn allow(&self, _url: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Err(Self::unavailable()) })
    }

    fn revoke(&self, _url: &str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        Box::pin(async { Err(Self::unavailable()) })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<AllowlistEntry>>> + Send + '_>> {
        Box::pin(async { Err(Self::unavailable()) })
    }
}
