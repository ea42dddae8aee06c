use super::types::{port_from_str_or_number, ProxyConfig, ProxyRules};
use serde::{Deserialize, Serialize};

/// Messages the browser shim sends to the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    Navigation {
        url: String,
        tab_id: i64,
        frame_id: i64,
    },
    SetProxy {
        #[serde(default)]
        request_id: Option<String>,
        host: String,
        #[serde(deserialize_with = "port_from_str_or_number")]
        port: String,
        #[serde(default)]
        protocol: Option<String>,
    },
    ClearProxy {
        #[serde(default)]
        request_id: Option<String>,
    },
    SaveProxyConfig {
        #[serde(default)]
        request_id: Option<String>,
        config: ProxyConfig,
    },
    SetVpn {
        #[serde(default)]
        request_id: Option<String>,
        enabled: bool,
    },
    VpnStatus {
        #[serde(default)]
        request_id: Option<String>,
    },
    Proceed {
        #[serde(default)]
        request_id: Option<String>,
        target: String,
    },
    ReportSafe {
        #[serde(default)]
        request_id: Option<String>,
        target: String,
    },
    /// Reply to a command the host sent earlier.
    Ack {
        request_id: String,
        #[serde(default)]
        success: bool,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

impl InboundMessage {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            InboundMessage::Navigation { .. } => None,
            InboundMessage::SetProxy { request_id, .. }
            | InboundMessage::ClearProxy { request_id }
            | InboundMessage::SaveProxyConfig { request_id, .. }
            | InboundMessage::SetVpn { request_id, .. }
            | InboundMessage::VpnStatus { request_id }
            | InboundMessage::Proceed { request_id, .. }
            | InboundMessage::ReportSafe { request_id, .. } => request_id.as_deref(),
            InboundMessage::Ack { request_id, .. } => Some(request_id),
        }
    }
}

/// Messages the host sends to the browser shim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    Redirect {
        request_id: String,
        tab_id: i64,
        url: String,
    },
    SetBadge {
        request_id: String,
        tab_id: i64,
        text: String,
        color: String,
    },
    ApplyProxy {
        request_id: String,
        config: ProxyRules,
    },
    ClearProxy {
        request_id: String,
    },
    GetProxy {
        request_id: String,
    },
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl OutboundMessage {
    pub fn response(request_id: Option<String>, response: MessageResponse) -> Self {
        OutboundMessage::Response {
            request_id,
            success: response.success,
            error: response.error,
            details: response.details,
        }
    }
}

/// `{success, error?, details?}` answer to a popup/interstitial request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn ok_with(details: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            details: Some(details),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details: None,
        }
    }
}
