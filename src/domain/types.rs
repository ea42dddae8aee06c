use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ─── Navigation Types ─────────────────────────────────────────────────────────

/// A navigation reported by the browser before it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub url: String,
    pub tab_id: i64,
    pub frame_id: i64,
}

impl NavigationEvent {
    pub fn top_level(url: impl Into<String>, tab_id: i64) -> Self {
        Self {
            url: url.into(),
            tab_id,
            frame_id: 0,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.frame_id == 0
    }
}

// ─── Verdict Types ────────────────────────────────────────────────────────────

/// Category of a scan reason, derived from the service's free-text reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Malware,
    Phishing,
    SuspiciousPatterns,
    IpAddressHost,
    SuspiciousTld,
    HighEntropyDomain,
    CommunityVerified,
    PopularDomain,
    Unspecified,
}

impl ReasonCategory {
    /// Classify free text returned by the scan service.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        if lower.contains("malware") {
            ReasonCategory::Malware
        } else if lower.contains("phish") {
            ReasonCategory::Phishing
        } else if lower.contains("ip address") {
            ReasonCategory::IpAddressHost
        } else if lower.contains("tld") {
            ReasonCategory::SuspiciousTld
        } else if lower.contains("entropy") {
            ReasonCategory::HighEntropyDomain
        } else if lower.contains("suspicious") {
            ReasonCategory::SuspiciousPatterns
        } else if lower.contains("community") {
            ReasonCategory::CommunityVerified
        } else if lower.contains("popular") {
            ReasonCategory::PopularDomain
        } else {
            ReasonCategory::Unspecified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReasonCategory::Malware => "Malware",
            ReasonCategory::Phishing => "Phishing",
            ReasonCategory::SuspiciousPatterns => "Suspicious URL Patterns",
            ReasonCategory::IpAddressHost => "IP Address Host",
            ReasonCategory::SuspiciousTld => "Suspicious TLD",
            ReasonCategory::HighEntropyDomain => "High Entropy Domain",
            ReasonCategory::CommunityVerified => "Verified by Community",
            ReasonCategory::PopularDomain => "Popular Domain",
            ReasonCategory::Unspecified => "Suspicious Patterns",
        }
    }
}

impl fmt::Display for ReasonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Why the service classified a URL the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictReason {
    pub category: ReasonCategory,
    #[serde(default)]
    pub detail: Option<String>,
}

impl VerdictReason {
    pub fn from_text(text: Option<&str>) -> Self {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Self {
                category: ReasonCategory::classify(text),
                detail: Some(text.to_string()),
            },
            None => Self::unspecified(),
        }
    }

    pub fn unspecified() -> Self {
        Self {
            category: ReasonCategory::Unspecified,
            detail: None,
        }
    }

    /// Text shown on the interstitial: the service's wording when present,
    /// otherwise the category label.
    pub fn display_text(&self) -> &str {
        match self.detail.as_deref() {
            Some(detail) if !detail.is_empty() => detail,
            _ => self.category.label(),
        }
    }
}

/// Normalized scan result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanVerdict {
    pub safe: bool,
    #[serde(default)]
    pub reason: Option<VerdictReason>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl ScanVerdict {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
            score: None,
        }
    }

    pub fn unsafe_because(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            safe: false,
            reason: Some(VerdictReason::from_text(Some(&reason))),
            score: None,
        }
    }

    /// Reason used when redirecting, falling back to `Unspecified`.
    pub fn reason_or_default(&self) -> VerdictReason {
        self.reason.clone().unwrap_or_else(VerdictReason::unspecified)
    }
}

/// Body returned by `POST /scan`.
#[derive(Debug, Deserialize)]
pub struct ScanResponseBody {
    pub safe: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl From<ScanResponseBody> for ScanVerdict {
    fn from(body: ScanResponseBody) -> Self {
        ScanVerdict {
            safe: body.safe,
            reason: body
                .reason
                .as_deref()
                .map(|text| VerdictReason::from_text(Some(text))),
            score: body.score,
        }
    }
}

/// User feedback sent to `POST /report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Safe,
    Unsafe,
}

#[derive(Debug, Serialize)]
pub struct ScanRequestBody<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ReportRequestBody<'a> {
    pub url: &'a str,
    pub vote: Vote,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

// ─── Decision Types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    SubFrame,
    InternalScheme,
}

/// Outcome of intercepting one navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Ignored(IgnoreReason),
    Allowlisted,
    Safe {
        cached: bool,
    },
    Blocked {
        reason: VerdictReason,
        interstitial_url: String,
        cached: bool,
    },
    /// The scan failed; navigation proceeds with an error badge.
    FailOpen {
        error: String,
    },
    /// A newer navigation on the same tab superseded this one.
    Cancelled,
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Blocked { .. })
    }
}

/// Per-tab indicator shown on the toolbar icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Safe,
    Error,
}

impl Badge {
    pub fn text(&self) -> &'static str {
        match self {
            Badge::Safe => "SAFE",
            Badge::Error => "ERR",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Badge::Safe => "#4CAF50",
            Badge::Error => "#9E9E9E",
        }
    }
}

// ─── Proxy Types ──────────────────────────────────────────────────────────────

pub const DEFAULT_PROXY_HOST: &str = "13.53.35.65";
pub const DEFAULT_PROXY_PORT: &str = "8888";
pub const DEFAULT_PROXY_PROTOCOL: &str = "http";

/// Proxy settings as entered in the popup. The port is kept as text and
/// parsed when the rules are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub host: String,
    #[serde(deserialize_with = "port_from_str_or_number")]
    pub port: String,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROXY_HOST.to_string(),
            port: DEFAULT_PROXY_PORT.to_string(),
            protocol: Some(DEFAULT_PROXY_PROTOCOL.to_string()),
        }
    }
}

pub(crate) fn port_from_str_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u64),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleProxy {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRuleSet {
    pub single_proxy: SingleProxy,
    pub bypass_list: Vec<String>,
}

/// Fixed-server proxy settings handed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRules {
    pub mode: String,
    pub rules: ProxyRuleSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_reason_text() {
        assert_eq!(ReasonCategory::classify("malware"), ReasonCategory::Malware);
        assert_eq!(
            ReasonCategory::classify("Suspicious URL patterns detected (91.0% confidence) (Suspicious TLD)"),
            ReasonCategory::SuspiciousTld
        );
        assert_eq!(
            ReasonCategory::classify("Verified Safe by Community (4 votes override AI suspicion)"),
            ReasonCategory::CommunityVerified
        );
        assert_eq!(ReasonCategory::classify("Safe (Popular Domain)"), ReasonCategory::PopularDomain);
        assert_eq!(ReasonCategory::classify("whatever"), ReasonCategory::Unspecified);
    }

    #[test]
    fn missing_reason_uses_default_label() {
        let reason = VerdictReason::from_text(None);
        assert_eq!(reason.category, ReasonCategory::Unspecified);
        assert_eq!(reason.display_text(), "Suspicious Patterns");

        let blank = VerdictReason::from_text(Some("  "));
        assert_eq!(blank, VerdictReason::unspecified());
    }

    #[test]
    fn scan_body_converts_to_verdict() {
        let body: ScanResponseBody =
            serde_json::from_str(r#"{"safe":false,"reason":"malware","score":0.97}"#).unwrap();
        let verdict = ScanVerdict::from(body);
        assert!(!verdict.safe);
        assert_eq!(verdict.score, Some(0.97));
        let reason = verdict.reason.unwrap();
        assert_eq!(reason.category, ReasonCategory::Malware);
        assert_eq!(reason.display_text(), "malware");
    }

    #[test]
    fn navigation_event_uses_camel_case() {
        let event: NavigationEvent =
            serde_json::from_str(r#"{"url":"https://a.example/","tabId":7,"frameId":2}"#).unwrap();
        assert_eq!(event.tab_id, 7);
        assert!(!event.is_top_level());
    }

    #[test]
    fn proxy_port_accepts_text_or_number() {
        let text: ProxyConfig =
            serde_json::from_str(r#"{"host":"h","port":"8080","protocol":"socks5"}"#).unwrap();
        let number: ProxyConfig = serde_json::from_str(r#"{"host":"h","port":8080}"#).unwrap();
        assert_eq!(text.port, "8080");
        assert_eq!(number.port, "8080");
        assert_eq!(number.protocol, None);
    }

    #[test]
    fn badge_text_and_color() {
        assert_eq!(Badge::Safe.text(), "SAFE");
        assert_eq!(Badge::Safe.color(), "#4CAF50");
        assert_eq!(Badge::Error.text(), "ERR");
        assert_eq!(Badge::Error.color(), "#9E9E9E");
    }
}
