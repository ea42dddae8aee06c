//! # Native Messaging Host
//!
//! Reads framed JSON messages from the browser shim, dispatches each one on
//! its own task, and writes replies and commands back through a single
//! writer task. Acks for host-issued commands are routed to [`HostPort`].

pub mod codec;
pub mod port;

pub use port::{Ack, HostPort};

use crate::abstractions::{AllowlistStore, ProxyControl, Scanner, TabControl};
use crate::commands::{self, CommandContext};
use crate::config::GuardConfig;
use crate::domain::{InboundMessage, OutboundMessage};
use crate::engine::{
    HttpScanClient, InterceptorOptions, InterstitialController, NavigationInterceptor,
    ProxyService, VerdictCache,
};
use crate::error::Result;
use crate::store::{Database, SettingsStore, SqliteAllowlist};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const OUTBOUND_QUEUE: usize = 64;

/// Everything the host needs besides the browser channel itself.
#[derive(Clone)]
pub struct HostServices {
    pub allowlist: Arc<dyn AllowlistStore>,
    pub scanner: Arc<dyn Scanner>,
    pub settings: SettingsStore,
    pub cache: Arc<VerdictCache>,
    pub options: InterceptorOptions,
    pub call_timeout: Duration,
    /// Whether the shim was granted proxy control.
    pub proxy_control: bool,
}

impl HostServices {
    pub fn from_config(config: &GuardConfig, db: Database) -> Result<Self> {
        let scanner = HttpScanClient::new(&config.api_url, config.scan_timeout())?;
        Ok(Self {
            allowlist: Arc::new(SqliteAllowlist::new(db.clone(), config.allowlist_ttl())),
            scanner: Arc::new(scanner),
            settings: SettingsStore::new(db),
            cache: Arc::new(VerdictCache::new(config.cache_ttl(), config.cache_capacity)),
            options: InterceptorOptions::from(config),
            call_timeout: config.host_call_timeout(),
            proxy_control: true,
        })
    }
}

fn command_context(services: &HostServices, port: &Arc<HostPort>) -> CommandContext {
    let tabs: Arc<dyn TabControl> = port.clone();
    let proxy_control: Option<Arc<dyn ProxyControl>> = if services.proxy_control {
        Some(port.clone())
    } else {
        None
    };

    CommandContext {
        interceptor: Arc::new(NavigationInterceptor::new(
            Arc::clone(&services.allowlist),
            Arc::clone(&services.cache),
            Arc::clone(&services.scanner),
            tabs,
            services.options.clone(),
        )),
        proxy: Arc::new(ProxyService::new(proxy_control, services.settings.clone())),
        interstitial: Arc::new(InterstitialController::new(
            Arc::clone(&services.allowlist),
            Arc::clone(&services.scanner),
        )),
    }
}

/// Run the host until the browser closes stdin.
///
/// Undecodable messages are logged and skipped; a broken frame ends the
/// session with an error.
pub async fn serve<R, W>(mut reader: R, mut writer: W, services: HostServices) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE);
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(err) = codec::write_message(&mut writer, &message).await {
                tracing::error!(error = %err, "failed to write host message");
            }
        }
    });

    let port = Arc::new(HostPort::new(outbound_tx, services.call_timeout));
    let ctx = command_context(&services, &port);
    let mut tasks = JoinSet::new();

    if services.proxy_control {
        let proxy = Arc::clone(&ctx.proxy);
        tasks.spawn(async move {
            if let Err(err) = proxy.restore().await {
                tracing::warn!(error = %err, "failed to restore saved proxy");
            }
        });
    }

    tracing::info!("native messaging host started");
    let result = loop {
        let frame = match codec::read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("browser closed the channel");
                break Ok(());
            }
            Err(err) => {
                tracing::error!(error = %err, "unreadable frame; stopping");
                break Err(err);
            }
        };

        let message = match codec::decode_message(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring message");
                continue;
            }
        };

        if let InboundMessage::Ack {
            request_id,
            success,
            error,
            details,
        } = message
        {
            port.complete(
                &request_id,
                Ack {
                    success,
                    error,
                    details,
                },
            );
            continue;
        }

        let ctx = ctx.clone();
        let port = Arc::clone(&port);
        tasks.spawn(async move {
            if let Some(reply) = commands::dispatch(&ctx, message).await {
                if let Err(err) = port.send(reply).await {
                    tracing::warn!(error = %err, "failed to queue reply");
                }
            }
        });

        while let Some(joined) = tasks.try_join_next() {
            if let Err(err) = joined {
                tracing::error!(error = %err, "message handler panicked");
            }
        }
    };

    tasks.shutdown().await;
    drop(ctx);
    drop(port);
    if let Err(err) = writer_task.await {
        tracing::error!(error = %err, "writer task failed");
    }
    result
}
