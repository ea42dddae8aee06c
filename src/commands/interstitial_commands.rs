use super::CommandContext;
use crate::domain::MessageResponse;
use crate::engine::{InterstitialAction, ReportOutcome};
use serde_json::json;

/// "Proceed anyway": allowlist the target and tell the page where to go.
pub async fn proceed(ctx: &CommandContext, target: &str) -> MessageResponse {
    match ctx.interstitial.proceed(target).await {
        Ok(InterstitialAction::Navigate(url)) => {
            MessageResponse::ok_with(json!({ "action": "navigate", "url": url }))
        }
        Ok(other) => MessageResponse::failed(format!("unexpected action {other:?}")),
        Err(err) => MessageResponse::failed(err.to_string()),
    }
}

pub async fn report_safe(ctx: &CommandContext, target: &str) -> MessageResponse {
    match ctx.interstitial.report_safe(target).await {
        ReportOutcome::Reported => MessageResponse::ok(),
        ReportOutcome::Failed(message) => MessageResponse::failed(message),
    }
}
