//! # Interstitial
//!
//! Builds and reads the warning page URL, and carries out the three actions
//! the warning page offers: go back, proceed once (allowlist the exact URL),
//! and report the URL as safe.

use crate::abstractions::{AllowlistStore, Scanner};
use crate::domain::{ReasonCategory, Vote};
use crate::error::{GuardError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

/// Characters JavaScript's `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// `{base}?target=...&reason=...` with both values component-encoded.
pub fn interstitial_url(base: &str, target: &str, reason: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{base}{separator}target={}&reason={}",
        encode_component(target),
        encode_component(reason)
    )
}

/// Query parameters the warning page reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterstitialParams {
    pub target: String,
    pub reason: String,
}

impl InterstitialParams {
    pub fn parse(page_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(page_url)
            .map_err(|err| GuardError::InvalidInput(format!("Invalid interstitial URL: {err}")))?;

        let mut target = None;
        let mut reason = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "target" => target = Some(value.into_owned()),
                "reason" => reason = Some(value.into_owned()),
                _ => {}
            }
        }

        let target = target
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GuardError::InvalidInput("Interstitial URL has no target".into()))?;
        let reason = reason
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| ReasonCategory::Unspecified.label().to_string());

        Ok(Self { target, reason })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterstitialAction {
    /// Navigate back in the tab's history.
    Back,
    /// No history to return to; close the tab.
    CloseTab,
    Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    Failed(String),
}

pub struct InterstitialController {
    allowlist: Arc<dyn AllowlistStore>,
    scanner: Arc<dyn Scanner>,
}

impl InterstitialController {
    pub fn new(allowlist: Arc<dyn AllowlistStore>, scanner: Arc<dyn Scanner>) -> Self {
        Self { allowlist, scanner }
    }

    pub fn go_back(history_len: usize) -> InterstitialAction {
        if history_len > 1 {
            InterstitialAction::Back
        } else {
            InterstitialAction::CloseTab
        }
    }

    /// Allowlist the exact target, then continue to it.
    pub async fn proceed(&self, target: &str) -> Result<InterstitialAction> {
        if target.is_empty() {
            return Err(GuardError::InvalidInput("Proceed target cannot be empty".into()));
        }
        self.allowlist.allow(target).await?;
        tracing::info!(url = %target, "user proceeded past warning; allowlisted");
        Ok(InterstitialAction::Navigate(target.to_string()))
    }

    /// Report the target as safe. Failures stay with the caller.
    pub async fn report_safe(&self, target: &str) -> ReportOutcome {
        match self.scanner.report(target, Vote::Safe).await {
            Ok(()) => ReportOutcome::Reported,
            Err(err) => {
                tracing::warn!(url = %target, error = %err, "report failed");
                ReportOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::InMemoryAllowlist;
    use crate::domain::ScanVerdict;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    #[test]
    fn builds_encoded_url() {
        let url = interstitial_url(
            "chrome-extension://abc/interstitial.html",
            "http://evil.example/",
            "malware",
        );
        assert_eq!(
            url,
            "chrome-extension://abc/interstitial.html?target=http%3A%2F%2Fevil.example%2F&reason=malware"
        );
    }

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(encode_component("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode_component("it's (ok)!~*"), "it's%20(ok)!~*");
        assert_eq!(encode_component("ü"), "%C3%BC");
        assert_eq!(encode_component("a+b"), "a%2Bb");
    }

    #[test]
    fn parse_round_trips_params() {
        let url = interstitial_url(
            "chrome-extension://abc/interstitial.html",
            "https://x.example/login?next=/a&b=1",
            "Suspicious URL patterns detected (87.5% confidence)",
        );
        let params = InterstitialParams::parse(&url).unwrap();
        assert_eq!(params.target, "https://x.example/login?next=/a&b=1");
        assert_eq!(params.reason, "Suspicious URL patterns detected (87.5% confidence)");
    }

    #[test]
    fn parse_defaults_missing_reason() {
        let params =
            InterstitialParams::parse("chrome-extension://abc/i.html?target=http%3A%2F%2Fa.example%2F")
                .unwrap();
        assert_eq!(params.reason, "Suspicious Patterns");
        assert!(InterstitialParams::parse("chrome-extension://abc/i.html").is_err());
    }

    #[test]
    fn go_back_closes_tab_without_history() {
        assert_eq!(InterstitialController::go_back(3), InterstitialAction::Back);
        assert_eq!(InterstitialController::go_back(1), InterstitialAction::CloseTab);
        assert_eq!(InterstitialController::go_back(0), InterstitialAction::CloseTab);
    }

    struct RecordingScanner {
        reports: Mutex<Vec<(String, Vote)>>,
        fail: bool,
    }

    impl Scanner for RecordingScanner {
        fn scan(
            &self,
            _url: &str,
        ) -> Pin<Box<dyn Future<Output = Result<ScanVerdict>> + Send + '_>> {
            Box::pin(async { Ok(ScanVerdict::safe()) })
        }

        fn report(
            &self,
            url: &str,
            vote: Vote,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            self.reports.lock().unwrap().push((url.to_string(), vote));
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(GuardError::Network("report returned 503 Service Unavailable".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn controller(fail: bool) -> (InterstitialController, Arc<InMemoryAllowlist>, Arc<RecordingScanner>) {
        let allowlist = Arc::new(InMemoryAllowlist::new());
        let scanner = Arc::new(RecordingScanner {
            reports: Mutex::new(Vec::new()),
            fail,
        });
        let controller = InterstitialController::new(allowlist.clone(), scanner.clone());
        (controller, allowlist, scanner)
    }

    #[tokio::test]
    async fn proceed_allowlists_then_navigates() {
        let (controller, allowlist, _) = controller(false);
        let action = controller.proceed("http://evil.example/").await.unwrap();

        assert_eq!(action, InterstitialAction::Navigate("http://evil.example/".into()));
        assert!(allowlist.is_allowed("http://evil.example/").await.unwrap());
    }

    #[tokio::test]
    async fn report_safe_sends_safe_vote() {
        let (controller, _, scanner) = controller(false);
        assert_eq!(
            controller.report_safe("http://evil.example/").await,
            ReportOutcome::Reported
        );
        assert_eq!(
            scanner.reports.lock().unwrap().as_slice(),
            &[("http://evil.example/".to_string(), Vote::Safe)]
        );
    }

    #[tokio::test]
    async fn report_failure_is_returned_not_raised() {
        let (controller, allowlist, _) = controller(true);
        let outcome = controller.report_safe("http://evil.example/").await;
        assert!(matches!(outcome, ReportOutcome::Failed(msg) if msg.contains("503")));
        assert!(!allowlist.is_allowed("http://evil.example/").await.unwrap());
    }
}
