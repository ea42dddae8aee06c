use super::cache::VerdictCache;
use crate::abstractions::Scanner;
use crate::domain::ScanVerdict;
use crate::error::{GuardError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

type ScanOutcome = Result<ScanVerdict>;

/// Coalesces concurrent scans of the same URL.
///
/// The first caller spawns a detached scan task; callers arriving while it
/// runs subscribe to its result. The task caches a successful verdict before
/// waking anyone, so every waiter and every later navigation sees the same
/// answer. Dropping a waiter never cancels the scan.
pub struct InflightScans {
    pending: Arc<Mutex<HashMap<String, broadcast::Sender<ScanOutcome>>>>,
}

impl InflightScans {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub async fn scan_or_join(
        &self,
        url: &str,
        scanner: Arc<dyn Scanner>,
        cache: Arc<VerdictCache>,
    ) -> Result<ScanVerdict> {
        let mut rx = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.get(url) {
                Some(tx) => {
                    tracing::debug!(url = %url, "joining in-flight scan");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    pending.insert(url.to_string(), tx.clone());
                    self.spawn_scan(url.to_string(), scanner, cache, tx);
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(GuardError::Network("scan ended without a result".into())),
        }
    }

    fn spawn_scan(
        &self,
        url: String,
        scanner: Arc<dyn Scanner>,
        cache: Arc<VerdictCache>,
        tx: broadcast::Sender<ScanOutcome>,
    ) {
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tracing::info!(url = %url, "scanning");
            let outcome = scanner.scan(&url).await;

            if let Ok(verdict) = &outcome {
                cache.put(&url, verdict.clone()).await;
            }

            // Unregister and publish under the lock so a joiner either
            // subscribed before the send or starts a fresh scan.
            let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.remove(&url);
            let _ = tx.send(outcome);
        });
    }
}

impl Default for InflightScans {
    fn default() -> Self {
        Self::new()
    }
}
