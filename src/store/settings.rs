use super::sqlite::{load_state, upsert_state, Database};
use crate::domain::ProxyConfig;
use crate::error::Result;

pub const VPN_ENABLED_KEY: &str = "vpnEnabled";
pub const PROXY_CONFIG_KEY: &str = "proxyConfig";

/// Persisted popup settings: the VPN toggle and the proxy form.
#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn vpn_enabled(&self) -> Result<bool> {
        let raw = self
            .db
            .with_conn(|conn| load_state(conn, VPN_ENABLED_KEY))
            .await?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(false),
        }
    }

    pub async fn set_vpn_enabled(&self, enabled: bool) -> Result<()> {
        let raw = serde_json::to_string(&enabled)?;
        self.db
            .with_conn(move |conn| upsert_state(conn, VPN_ENABLED_KEY, &raw))
            .await
    }

    pub async fn proxy_config(&self) -> Result<Option<ProxyConfig>> {
        let raw = self
            .db
            .with_conn(|conn| load_state(conn, PROXY_CONFIG_KEY))
            .await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stored config, or the built-in default server.
    pub async fn proxy_config_or_default(&self) -> Result<ProxyConfig> {
        Ok(self.proxy_config().await?.unwrap_or_default())
    }

    pub async fn set_proxy_config(&self, config: &ProxyConfig) -> Result<()> {
        let raw = serde_json::to_string(config)?;
        self.db
            .with_conn(move |conn| upsert_state(conn, PROXY_CONFIG_KEY, &raw))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn vpn_defaults_to_disabled() {
        let settings = store();
        assert!(!settings.vpn_enabled().await.unwrap());

        settings.set_vpn_enabled(true).await.unwrap();
        assert!(settings.vpn_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn proxy_config_round_trip_and_default() {
        let settings = store();
        assert_eq!(settings.proxy_config().await.unwrap(), None);
        assert_eq!(
            settings.proxy_config_or_default().await.unwrap(),
            ProxyConfig::default()
        );

        let config = ProxyConfig {
            host: "10.0.0.2".into(),
            port: "3128".into(),
            protocol: Some("https".into()),
        };
        settings.set_proxy_config(&config).await.unwrap();
        assert_eq!(settings.proxy_config().await.unwrap(), Some(config));
    }
}
