use crate::domain::{Badge, ProxyRules};
use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Tab operations the guard needs from the browser.
pub trait TabControl: Send + Sync {
    /// Replace the tab's pending navigation with `url`.
    fn redirect(&self, tab_id: i64, url: &str)
        -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn set_badge(&self, tab_id: i64, badge: Badge)
        -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Browser proxy settings.
pub trait ProxyControl: Send + Sync {
    fn apply(&self, rules: &ProxyRules) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Current settings as reported by the browser, including
    /// `levelOfControl`.
    fn current(&self) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + '_>>;
}
