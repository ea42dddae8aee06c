use crate::abstractions::ProxyControl;
use crate::domain::{
    MessageResponse, ProxyConfig, ProxyRuleSet, ProxyRules, SingleProxy, DEFAULT_PROXY_PROTOCOL,
};
use crate::error::{GuardError, Result};
use crate::store::SettingsStore;
use serde_json::json;
use std::sync::Arc;

pub const BYPASS_LIST: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Build fixed-server rules from the popup's proxy form.
pub fn build_rules(config: &ProxyConfig) -> Result<ProxyRules> {
    let host = config.host.trim();
    if host.is_empty() {
        return Err(GuardError::InvalidInput("Proxy host cannot be empty".into()));
    }

    let port: u16 = config
        .port
        .trim()
        .parse()
        .map_err(|err| GuardError::InvalidInput(format!("invalid_port: `{}` ({err})", config.port)))?;
    if port == 0 {
        return Err(GuardError::InvalidInput("invalid_port: `0`".into()));
    }

    let scheme = config
        .protocol
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROXY_PROTOCOL)
        .to_ascii_lowercase();

    Ok(ProxyRules {
        mode: "fixed_servers".to_string(),
        rules: ProxyRuleSet {
            single_proxy: SingleProxy {
                scheme,
                host: host.to_string(),
                port,
            },
            bypass_list: BYPASS_LIST.iter().map(|s| s.to_string()).collect(),
        },
    })
}

/// Map the browser's `levelOfControl` to a status the popup can show.
pub fn control_status(level_of_control: &str) -> Option<&'static str> {
    match level_of_control {
        "controlled_by_other_extension" => Some("Error: Another extension is controlling proxy!"),
        "not_controllable" => Some("Error: Proxy settings check prohibited by policy."),
        _ => None,
    }
}

fn failure(err: &GuardError) -> MessageResponse {
    match err {
        GuardError::Permission(_) => MessageResponse::failed(err.code()),
        GuardError::InvalidInput(message) => MessageResponse::failed(message.clone()),
        other => MessageResponse::failed(other.to_string()),
    }
}

/// Handles the popup's proxy and VPN requests.
///
/// `control` is `None` when the browser did not grant proxy control; every
/// operation that needs it answers `permissions_missing`.
pub struct ProxyService {
    control: Option<Arc<dyn ProxyControl>>,
    settings: SettingsStore,
}

impl ProxyService {
    pub fn new(control: Option<Arc<dyn ProxyControl>>, settings: SettingsStore) -> Self {
        Self { control, settings }
    }

    fn control(&self) -> Result<&Arc<dyn ProxyControl>> {
        self.control.as_ref().ok_or_else(|| {
            tracing::error!("proxy API not available; check permissions");
            GuardError::Permission("proxy control unavailable".into())
        })
    }

    async fn apply(&self, config: &ProxyConfig) -> Result<serde_json::Value> {
        let control = self.control()?;
        let rules = build_rules(config)?;
        tracing::info!(
            host = %rules.rules.single_proxy.host,
            port = rules.rules.single_proxy.port,
            scheme = %rules.rules.single_proxy.scheme,
            "setting proxy"
        );
        control.apply(&rules).await?;
        control.current().await
    }

    pub async fn set_proxy(&self, config: &ProxyConfig) -> MessageResponse {
        match self.apply(config).await {
            Ok(details) => MessageResponse::ok_with(details),
            Err(err) => {
                tracing::error!(error = %err, "error setting proxy");
                failure(&err)
            }
        }
    }

    pub async fn clear_proxy(&self) -> MessageResponse {
        let result = match self.control() {
            Ok(control) => control.clear().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                tracing::info!("proxy cleared");
                MessageResponse::ok()
            }
            Err(err) => failure(&err),
        }
    }

    /// Persist the form; re-apply immediately when the VPN is on.
    pub async fn save_config(&self, config: &ProxyConfig) -> MessageResponse {
        if let Err(err) = build_rules(config) {
            return failure(&err);
        }
        if let Err(err) = self.settings.set_proxy_config(config).await {
            return failure(&err);
        }
        match self.settings.vpn_enabled().await {
            Ok(true) => self.set_proxy(config).await,
            Ok(false) => MessageResponse::ok(),
            Err(err) => failure(&err),
        }
    }

    /// Toggle the VPN: store the flag, then apply the saved (or default)
    /// config or clear the proxy.
    pub async fn set_vpn(&self, enabled: bool) -> MessageResponse {
        if let Err(err) = self.settings.set_vpn_enabled(enabled).await {
            return failure(&err);
        }
        if !enabled {
            return self.clear_proxy().await;
        }
        match self.settings.proxy_config_or_default().await {
            Ok(config) => self.set_proxy(&config).await,
            Err(err) => failure(&err),
        }
    }

    /// Re-apply the stored proxy on host start when the VPN was left on.
    pub async fn restore(&self) -> Result<bool> {
        if !self.settings.vpn_enabled().await? {
            return Ok(false);
        }
        let config = self.settings.proxy_config_or_default().await?;
        self.apply(&config).await?;
        tracing::info!("restored proxy from saved settings");
        Ok(true)
    }

    pub async fn status(&self) -> MessageResponse {
        let enabled = match self.settings.vpn_enabled().await {
            Ok(enabled) => enabled,
            Err(err) => return failure(&err),
        };
        let config = match self.settings.proxy_config_or_default().await {
            Ok(config) => config,
            Err(err) => return failure(&err),
        };

        let mut status = if enabled { "VPN Connected" } else { "Disconnected" }.to_string();
        let mut current = serde_json::Value::Null;
        if let Some(control) = &self.control {
            match control.current().await {
                Ok(value) => {
                    if let Some(message) = value
                        .get("levelOfControl")
                        .and_then(|v| v.as_str())
                        .and_then(control_status)
                    {
                        status = message.to_string();
                    }
                    current = value;
                }
                Err(err) => tracing::warn!(error = %err, "failed to read proxy settings"),
            }
        } else {
            status = "Error: chrome.proxy API missing (Permissions?)".to_string();
        }

        MessageResponse::ok_with(json!({
            "vpnEnabled": enabled,
            "proxyConfig": config,
            "status": status,
            "current": current,
        }))
    }
}
