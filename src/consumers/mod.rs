//! Realtime connection handlers.
//!
//! A connection goes through `Connecting -> Authorized -> Open -> Closed`:
//! a consumer is built only once the caller is authorized, then [`run`]
//! joins its group, acknowledges the connection and multiplexes client
//! frames, group events and consumer output until either side goes away.

pub mod admin_logs;
pub mod chat_room;
pub mod conversation;
pub mod notifications;
pub mod tweet_queue;

use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult};
use crate::entities::sessions::Session;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::repositories::groups::{GroupEvent, GroupName, GroupSubscription};
use crate::usecases::groups;
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the driver reads from a socket.
#[derive(Debug)]
pub enum Incoming {
    Text(String),
    /// Binary payloads are not part of the protocol and are ignored
    Binary,
    Closed,
}

/// What the driver writes to a socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Frame(OutboundFrame),
    Close { code: u16, reason: &'static str },
}

#[async_trait]
pub trait Consumer: Send {
    fn name(&self) -> &'static str;

    fn session(&self) -> &Session;

    /// Group joined while the connection is open.
    fn group(&self) -> Option<GroupName>;

    /// Frames sent right after the connection acknowledgement.
    fn greeting(&self) -> Vec<OutboundFrame> {
        vec![]
    }

    /// Whether a group event reaches this connection. By default a user's
    /// own events are not echoed back to them.
    fn accepts(&self, event: &GroupEvent) -> bool {
        event.origin != Some(self.session().user_id)
    }

    async fn on_frame(&mut self, frame: InboundFrame) -> ServiceResult<Option<OutboundFrame>>;

    /// Output produced by the consumer on its own, such as a log tail.
    async fn next_output(&mut self) -> Option<OutboundFrame> {
        futures::future::pending().await
    }

    async fn on_close(&mut self) {}
}

/// Requires an authenticated session.
pub fn require_session(session: Option<Session>) -> ServiceResult<Session> {
    session.ok_or(AppError::Unauthorized)
}

/// Drives one connection until it closes. A failed authorization closes the
/// socket right away with the error's close code.
pub async fn run<X, C, I, O>(ctx: &X, authorized: ServiceResult<C>, mut incoming: I, mut outgoing: O)
where
    X: Context + ?Sized,
    C: Consumer,
    I: Stream<Item = Incoming> + Unpin + Send,
    O: Sink<Outgoing> + Unpin + Send,
{
    let mut consumer = match authorized {
        Ok(consumer) => consumer,
        Err(e) => {
            info!(code = e.code(), "Rejecting connection");
            let close = Outgoing::Close {
                code: e.ws_close_code(),
                reason: e.code(),
            };
            let _ = outgoing.send(close).await;
            return;
        }
    };

    let user_id = consumer.session().user_id;
    let group = consumer.group();
    let mut subscription = group.map(|group| groups::join(ctx, group));
    info!(
        consumer = consumer.name(),
        user_id,
        group = group.map(|g| g.to_string()),
        "Connection opened"
    );

    let mut opening = vec![OutboundFrame::ConnectionEstablished {
        group: group.map(|g| g.to_string()),
        user_id,
    }];
    opening.extend(consumer.greeting());
    for frame in opening {
        if outgoing.send(Outgoing::Frame(frame)).await.is_err() {
            consumer.on_close().await;
            return;
        }
    }

    loop {
        let reply = tokio::select! {
            incoming = incoming.next() => match incoming {
                Some(Incoming::Text(text)) => handle_text(&mut consumer, &text).await,
                Some(Incoming::Binary) => None,
                Some(Incoming::Closed) | None => break,
            },
            event = next_event(&mut subscription) => match event {
                Some(event) if consumer.accepts(&event) => Some(event.frame.clone()),
                Some(_) => None,
                None => break,
            },
            Some(frame) = consumer.next_output() => Some(frame),
        };
        if let Some(frame) = reply
            && outgoing.send(Outgoing::Frame(frame)).await.is_err()
        {
            break;
        }
    }

    consumer.on_close().await;
    drop(subscription);
    info!(consumer = consumer.name(), user_id, "Connection closed");
}

/// Per-frame failures are reported to the client and never close the
/// connection.
async fn handle_text<C: Consumer>(consumer: &mut C, text: &str) -> Option<OutboundFrame> {
    let frame = match InboundFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(code = e.code(), "Rejected inbound frame");
            return Some(OutboundFrame::error(&e));
        }
    };
    let frame_type = frame.name();
    match consumer.on_frame(frame).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(
                consumer = consumer.name(),
                user_id = consumer.session().user_id,
                frame_type,
                code = e.code(),
                "Failed to handle frame"
            );
            Some(OutboundFrame::error(&e))
        }
    }
}

async fn next_event(subscription: &mut Option<GroupSubscription>) -> Option<Arc<GroupEvent>> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => futures::future::pending().await,
    }
}
