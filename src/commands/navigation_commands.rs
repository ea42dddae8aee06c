use super::CommandContext;
use crate::domain::{Decision, NavigationEvent};

pub async fn on_navigation(ctx: &CommandContext, url: String, tab_id: i64, frame_id: i64) -> Decision {
    let event = NavigationEvent {
        url,
        tab_id,
        frame_id,
    };
    ctx.interceptor.handle(event).await
}
