use crate::abstractions::{ProxyControl, TabControl};
use crate::domain::{Badge, OutboundMessage, ProxyRules};
use crate::engine::cancel::CancelRegistry;
use crate::error::{GuardError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Browser's answer to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Outbound side of the native messaging channel.
///
/// Each command carries a fresh `requestId`; the caller waits for the
/// matching `ack` for at most `timeout` and can be cancelled by id.
pub struct HostPort {
    outbound: mpsc::Sender<OutboundMessage>,
    pending: Mutex<HashMap<String, oneshot::Sender<Ack>>>,
    cancels: CancelRegistry,
    next_id: AtomicU64,
    timeout: Duration,
}

impl HostPort {
    pub fn new(outbound: mpsc::Sender<OutboundMessage>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            cancels: CancelRegistry::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    fn next_request_id(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("host-{id}")
    }

    /// Send a message that expects no ack (replies to inbound requests).
    pub async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| GuardError::Protocol("host output closed".into()))
    }

    /// Send a command and wait for its ack.
    pub async fn call<F>(&self, build: F) -> Result<Option<serde_json::Value>>
    where
        F: FnOnce(String) -> OutboundMessage,
    {
        let request_id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.clone(), tx);
        let mut cancel = self.cancels.register(&request_id);

        let result = match self.send(build(request_id.clone())).await {
            Ok(()) => {
                tokio::select! {
                    ack = tokio::time::timeout(self.timeout, rx) => match ack {
                        Ok(Ok(ack)) => ack_result(ack),
                        Ok(Err(_)) => Err(GuardError::Cancelled),
                        Err(_) => Err(GuardError::Timeout(self.timeout.as_millis() as u64)),
                    },
                    _ = cancel.cancelled() => Err(GuardError::Cancelled),
                }
            }
            Err(err) => Err(err),
        };

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_id);
        self.cancels.remove(&cancel);

        if let Err(err) = &result {
            tracing::debug!(request_id = %request_id, error = %err, "host call failed");
        }
        result
    }

    /// Deliver an ack to its waiting caller. Returns false for unknown ids.
    pub fn complete(&self, request_id: &str, ack: Ack) -> bool {
        let waiter = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id);
        match waiter {
            Some(tx) => tx.send(ack).is_ok(),
            None => {
                tracing::warn!(request_id = %request_id, "ack for unknown request");
                false
            }
        }
    }

    pub fn cancel(&self, request_id: &str) -> bool {
        self.cancels.cancel(request_id)
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn ack_result(ack: Ack) -> Result<Option<serde_json::Value>> {
    if ack.success {
        return Ok(ack.details);
    }
    match ack.error.as_deref() {
        Some("permissions_missing") => Err(GuardError::Permission("permissions_missing".into())),
        Some(error) => Err(GuardError::Protocol(format!("browser rejected command: {error}"))),
        None => Err(GuardError::Protocol("browser rejected command".into())),
    }
}

impl TabControl for HostPort {
    fn redirect(&self, tab_id: i64, url: &str)
        -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let url = url.to_string();
        Box::pin(async move {
            self.call(|request_id| OutboundMessage::Redirect {
                request_id,
                tab_id,
                url,
            })
            .await
            .map(|_| ())
        })
    }

    fn set_badge(&self, tab_id: i64, badge: Badge)
        -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.call(|request_id| OutboundMessage::SetBadge {
                request_id,
                tab_id,
                text: badge.text().to_string(),
                color: badge.color().to_string(),
            })
            .await
            .map(|_| ())
        })
    }
}

impl ProxyControl for HostPort {
    fn apply(&self, rules: &ProxyRules) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let rules = rules.clone();
        Box::pin(async move {
            self.call(|request_id| OutboundMessage::ApplyProxy {
                request_id,
                config: rules,
            })
            .await
            .map(|_| ())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.call(|request_id| OutboundMessage::ClearProxy { request_id })
                .await
                .map(|_| ())
        })
    }

    fn current(&self) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + '_>> {
        Box::pin(async move {
            let details = self
                .call(|request_id| OutboundMessage::GetProxy { request_id })
                .await?;
            Ok(details.unwrap_or(serde_json::Value::Null))
        })
    }
}
