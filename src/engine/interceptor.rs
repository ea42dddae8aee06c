use super::cache::VerdictCache;
use super::cancel::CancelRegistry;
use super::inflight::InflightScans;
use super::interstitial::interstitial_url;
use crate::abstractions::{AllowlistStore, Scanner, TabControl};
use crate::config::{default_internal_schemes, GuardConfig};
use crate::domain::{Badge, Decision, IgnoreReason, NavigationEvent, ScanVerdict};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InterceptorOptions {
    /// URL prefixes never sent for scanning.
    pub internal_schemes: Vec<String>,
    /// Warning page the tab is redirected to.
    pub interstitial_url: String,
}

impl Default for InterceptorOptions {
    fn default() -> Self {
        Self::from(&GuardConfig::default())
    }
}

impl From<&GuardConfig> for InterceptorOptions {
    fn from(config: &GuardConfig) -> Self {
        let internal_schemes = if config.internal_schemes.is_empty() {
            default_internal_schemes()
        } else {
            config.internal_schemes.clone()
        };
        Self {
            internal_schemes,
            interstitial_url: config.interstitial_url.clone(),
        }
    }
}

/// Decides, for every top-level navigation, whether to let it through or
/// send the tab to the warning page.
///
/// Order, first match wins: sub-frame, internal scheme, allowlist, verdict
/// cache, then a (coalesced) scan. Scan failures fail open with an error
/// badge.
pub struct NavigationInterceptor {
    allowlist: Arc<dyn AllowlistStore>,
    cache: Arc<VerdictCache>,
    scanner: Arc<dyn Scanner>,
    tabs: Arc<dyn TabControl>,
    inflight: InflightScans,
    cancels: CancelRegistry,
    options: InterceptorOptions,
}

impl NavigationInterceptor {
    pub fn new(
        allowlist: Arc<dyn AllowlistStore>,
        cache: Arc<VerdictCache>,
        scanner: Arc<dyn Scanner>,
        tabs: Arc<dyn TabControl>,
        options: InterceptorOptions,
    ) -> Self {
        Self {
            allowlist,
            cache,
            scanner,
            tabs,
            inflight: InflightScans::new(),
            cancels: CancelRegistry::new(),
            options,
        }
    }

    pub fn cache(&self) -> &Arc<VerdictCache> {
        &self.cache
    }

    pub fn is_internal(&self, url: &str) -> bool {
        let lower = url.trim_start().to_ascii_lowercase();
        self.options
            .internal_schemes
            .iter()
            .any(|scheme| lower.starts_with(&scheme.to_ascii_lowercase()))
    }

    /// Decide and apply the resulting tab effects.
    ///
    /// A newer navigation on the same tab supersedes this one; the superseded
    /// call returns `Decision::Cancelled` and touches nothing. The scan it
    /// may have started keeps running and still fills the cache.
    pub async fn handle(&self, event: NavigationEvent) -> Decision {
        if !event.is_top_level() {
            return Decision::Ignored(IgnoreReason::SubFrame);
        }

        let mut cancel = self.cancels.register(&format!("tab:{}", event.tab_id));
        let decision = tokio::select! {
            decision = self.decide(&event) => decision,
            _ = cancel.cancelled() => {
                tracing::debug!(url = %event.url, tab_id = event.tab_id, "navigation superseded");
                Decision::Cancelled
            }
        };
        self.cancels.remove(&cancel);

        self.apply(&event, &decision).await;
        decision
    }

    /// Pure decision for one navigation; no tab effects.
    pub async fn decide(&self, event: &NavigationEvent) -> Decision {
        let url = event.url.as_str();

        if !event.is_top_level() {
            return Decision::Ignored(IgnoreReason::SubFrame);
        }

        if self.is_internal(url) {
            return Decision::Ignored(IgnoreReason::InternalScheme);
        }

        match self.allowlist.is_allowed(url).await {
            Ok(true) => {
                tracing::info!(url = %url, "skipping allowed URL");
                return Decision::Allowlisted;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "allowlist lookup failed; scanning");
            }
        }

        if let Some(verdict) = self.cache.get(url).await {
            tracing::debug!(url = %url, safe = verdict.safe, "verdict cache hit");
            return self.verdict_decision(url, &verdict, true);
        }

        match self
            .inflight
            .scan_or_join(url, Arc::clone(&self.scanner), Arc::clone(&self.cache))
            .await
        {
            Ok(verdict) => self.verdict_decision(url, &verdict, false),
            Err(err) => {
                tracing::error!(url = %url, error = %err, "scan failed; allowing navigation");
                Decision::FailOpen {
                    error: err.to_string(),
                }
            }
        }
    }

    fn verdict_decision(&self, url: &str, verdict: &ScanVerdict, cached: bool) -> Decision {
        if verdict.safe {
            return Decision::Safe { cached };
        }

        let reason = verdict.reason_or_default();
        let interstitial_url =
            interstitial_url(&self.options.interstitial_url, url, reason.display_text());
        tracing::info!(url = %url, reason = %reason.display_text(), cached, "blocking navigation");
        Decision::Blocked {
            reason,
            interstitial_url,
            cached,
        }
    }

    async fn apply(&self, event: &NavigationEvent, decision: &Decision) {
        let result = match decision {
            Decision::Blocked {
                interstitial_url, ..
            } => self.tabs.redirect(event.tab_id, interstitial_url).await,
            Decision::Safe { cached: false } => self.tabs.set_badge(event.tab_id, Badge::Safe).await,
            Decision::FailOpen { .. } => self.tabs.set_badge(event.tab_id, Badge::Error).await,
            _ => Ok(()),
        };

        if let Err(err) = result {
            tracing::warn!(tab_id = event.tab_id, error = %err, "failed to apply navigation decision");
        }
    }
}
