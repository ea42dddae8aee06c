//! # Message Commands
//!
//! One handler per inbound request type. Handlers are thin: they unpack the
//! message, call into the engine, and shape a [`MessageResponse`].

pub mod interstitial_commands;
pub mod navigation_commands;
pub mod proxy_commands;

use crate::domain::{InboundMessage, OutboundMessage, ProxyConfig};
use crate::engine::{InterstitialController, NavigationInterceptor, ProxyService};
use std::sync::Arc;

/// Services a running host hands to every message handler.
#[derive(Clone)]
pub struct CommandContext {
    pub interceptor: Arc<NavigationInterceptor>,
    pub proxy: Arc<ProxyService>,
    pub interstitial: Arc<InterstitialController>,
}

/// Route one inbound message. Navigations and acks produce no reply.
pub async fn dispatch(ctx: &CommandContext, message: InboundMessage) -> Option<OutboundMessage> {
    let request_id = message.request_id().map(str::to_string);
    let response = match message {
        InboundMessage::Navigation {
            url,
            tab_id,
            frame_id,
        } => {
            navigation_commands::on_navigation(ctx, url, tab_id, frame_id).await;
            return None;
        }
        InboundMessage::Ack { .. } => return None,
        InboundMessage::SetProxy {
            host,
            port,
            protocol,
            ..
        } => proxy_commands::set_proxy(ctx, ProxyConfig { host, port, protocol }).await,
        InboundMessage::ClearProxy { .. } => proxy_commands::clear_proxy(ctx).await,
        InboundMessage::SaveProxyConfig { config, .. } => {
            proxy_commands::save_proxy_config(ctx, config).await
        }
        InboundMessage::SetVpn { enabled, .. } => proxy_commands::set_vpn(ctx, enabled).await,
        InboundMessage::VpnStatus { .. } => proxy_commands::vpn_status(ctx).await,
        InboundMessage::Proceed { target, .. } => interstitial_commands::proceed(ctx, &target).await,
        InboundMessage::ReportSafe { target, .. } => {
            interstitial_commands::report_safe(ctx, &target).await
        }
    };

    Some(OutboundMessage::response(request_id, response))
}
