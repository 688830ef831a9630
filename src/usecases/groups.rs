use crate::common::context::Context;
use crate::repositories::groups::{GroupEvent, GroupName, GroupSubscription};
use tracing::error;

/// Fire-and-forget: a failed publish is logged, never surfaced.
pub async fn publish<C: Context + ?Sized>(ctx: &C, group: GroupName, event: GroupEvent) {
    if let Err(e) = ctx.broadcaster().publish(group, event).await {
        error!(group = %group, "Failed to publish group event: {e:?}");
    }
}

pub fn join<C: Context + ?Sized>(ctx: &C, group: GroupName) -> GroupSubscription {
    ctx.broadcaster().subscribe(group)
}
