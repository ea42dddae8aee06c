use super::CommandContext;
use crate::domain::{MessageResponse, ProxyConfig};

pub async fn set_proxy(ctx: &CommandContext, config: ProxyConfig) -> MessageResponse {
    ctx.proxy.set_proxy(&config).await
}

pub async fn clear_proxy(ctx: &CommandContext) -> MessageResponse {
    ctx.proxy.clear_proxy().await
}

pub async fn save_proxy_config(ctx: &CommandContext, config: ProxyConfig) -> MessageResponse {
    ctx.proxy.save_config(&config).await
}

pub async fn set_vpn(ctx: &CommandContext, enabled: bool) -> MessageResponse {
    ctx.proxy.set_vpn(enabled).await
}

pub async fn vpn_status(ctx: &CommandContext) -> MessageResponse {
    ctx.proxy.status().await
}
