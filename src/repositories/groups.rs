use crate::common::redis_pool::RedisPool;
use crate::models::frames::OutboundFrame;
use async_trait::async_trait;
use futures::StreamExt;
use hashbrown::HashMap;
use parking_lot::Mutex;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// Broadcast groups a connection can join.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupName {
    /// Attached is the conversation id
    Conversation(i64),
    /// Private notification group of a user
    User(i64),
    TweetQueue { organization_id: i64, brand_id: i64 },
    /// Legacy brand-to-user room
    Room(i64),
}

impl Display for GroupName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupName::Conversation(conversation_id) => {
                write!(f, "conversation_{conversation_id}")
            }
            GroupName::User(user_id) => write!(f, "user_{user_id}"),
            GroupName::TweetQueue {
                organization_id,
                brand_id,
            } => write!(f, "tweet_queue_{organization_id}_{brand_id}"),
            GroupName::Room(room_id) => write!(f, "chat_{room_id}"),
        }
    }
}

/// Payload carried through a group. `origin` is the user whose action
/// produced the frame, so their own connections can skip it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GroupEvent {
    #[serde(default)]
    pub origin: Option<i64>,
    pub frame: OutboundFrame,
}

impl GroupEvent {
    pub fn new(frame: OutboundFrame) -> Self {
        Self {
            origin: None,
            frame,
        }
    }

    pub fn from_user(user_id: i64, frame: OutboundFrame) -> Self {
        Self {
            origin: Some(user_id),
            frame,
        }
    }
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publishing to a group nobody has joined is not an error.
    async fn publish(&self, group: GroupName, event: GroupEvent) -> anyhow::Result<()>;

    /// The membership lasts until the returned subscription is dropped.
    fn subscribe(&self, group: GroupName) -> GroupSubscription;
}

const GROUP_CAPACITY: usize = 256;

/// In-process fan-out: one broadcast channel per group, removed as soon as
/// the last member leaves.
#[derive(Default)]
pub struct GroupHub {
    groups: Mutex<HashMap<String, broadcast::Sender<Arc<GroupEvent>>>>,
}

impl GroupHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many members received the event.
    pub fn send(&self, group: &str, event: GroupEvent) -> usize {
        let groups = self.groups.lock();
        match groups.get(group) {
            Some(sender) => sender.send(Arc::new(event)).unwrap_or(0),
            None => 0,
        }
    }

    pub fn join(self: &Arc<Self>, group: GroupName) -> GroupSubscription {
        let key = group.to_string();
        let mut groups = self.groups.lock();
        let receiver = groups
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .subscribe();
        GroupSubscription {
            hub: Arc::clone(self),
            key,
            receiver: Some(receiver),
        }
    }

    pub fn is_active(&self, group: GroupName) -> bool {
        self.groups.lock().contains_key(&group.to_string())
    }

    pub fn member_count(&self, group: GroupName) -> usize {
        self.groups
            .lock()
            .get(&group.to_string())
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn leave(&self, key: &str) {
        let mut groups = self.groups.lock();
        if groups
            .get(key)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            groups.remove(key);
        }
    }
}

pub struct GroupSubscription {
    hub: Arc<GroupHub>,
    key: String,
    // taken on drop, before the group is checked for remaining members
    receiver: Option<broadcast::Receiver<Arc<GroupEvent>>>,
}

impl GroupSubscription {
    /// Waits for the next event. Events dropped because this member lagged
    /// behind are skipped.
    pub async fn recv(&mut self) -> Option<Arc<GroupEvent>> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(group = %self.key, skipped, "Group member lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for GroupSubscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.hub.leave(&self.key);
    }
}

pub struct LocalBroadcaster {
    hub: Arc<GroupHub>,
}

impl LocalBroadcaster {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(GroupHub::new()),
        }
    }

    pub fn hub(&self) -> &Arc<GroupHub> {
        &self.hub
    }
}

impl Default for LocalBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for LocalBroadcaster {
    async fn publish(&self, group: GroupName, event: GroupEvent) -> anyhow::Result<()> {
        self.hub.send(&group.to_string(), event);
        Ok(())
    }

    fn subscribe(&self, group: GroupName) -> GroupSubscription {
        self.hub.join(group)
    }
}

const CHANNEL_PREFIX: &str = "chat:groups:";
const CHANNEL_PATTERN: &str = const_str::concat!(CHANNEL_PREFIX, "*");

fn make_channel(group: GroupName) -> String {
    format!("{CHANNEL_PREFIX}{group}")
}

/// Cross-process fan-out: events are published on `chat:groups:{group}` and
/// a relay task feeds every received event into the local hub.
pub struct RedisBroadcaster {
    hub: Arc<GroupHub>,
    redis: RedisPool,
}

impl RedisBroadcaster {
    pub async fn start(client: redis::Client, redis: RedisPool) -> anyhow::Result<Self> {
        let hub = Arc::new(GroupHub::new());
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.psubscribe(CHANNEL_PATTERN).await?;
        info!(pattern = CHANNEL_PATTERN, "Subscribed to group channels");

        let relay_hub = Arc::clone(&hub);
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let channel = msg.get_channel_name();
                let Some(group) = channel.strip_prefix(CHANNEL_PREFIX) else {
                    continue;
                };
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(channel, "Unreadable group payload: {e}");
                        continue;
                    }
                };
                match serde_json::from_str::<GroupEvent>(&payload) {
                    Ok(event) => {
                        relay_hub.send(group, event);
                    }
                    Err(e) => warn!(channel, "Invalid group event: {e}"),
                }
            }
            error!("Group channel subscription ended");
        });

        Ok(Self { hub, redis })
    }
}

#[async_trait]
impl Broadcaster for RedisBroadcaster {
    async fn publish(&self, group: GroupName, event: GroupEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&event)?;
        let mut redis = self.redis.get().await?;
        let _: () = redis.publish(make_channel(group), payload).await?;
        Ok(())
    }

    fn subscribe(&self, group: GroupName) -> GroupSubscription {
        self.hub.join(group)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BroadcastBackend {
    Local,
    Redis,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown broadcast backend: {0}")]
pub struct UnknownBroadcastBackend(String);

impl FromStr for BroadcastBackend {
    type Err = UnknownBroadcastBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BroadcastBackend::Local),
            "redis" => Ok(BroadcastBackend::Redis),
            _ => Err(UnknownBroadcastBackend(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pong() -> OutboundFrame {
        OutboundFrame::Pong {
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn group_names() {
        assert_eq!(GroupName::Conversation(5).to_string(), "conversation_5");
        assert_eq!(GroupName::User(3).to_string(), "user_3");
        assert_eq!(GroupName::Room(9).to_string(), "chat_9");
        let queue = GroupName::TweetQueue {
            organization_id: 2,
            brand_id: 4,
        };
        assert_eq!(queue.to_string(), "tweet_queue_2_4");
        assert_eq!(make_channel(queue), "chat:groups:tweet_queue_2_4");
    }

    #[test]
    fn parses_backend() {
        assert_eq!("local".parse::<BroadcastBackend>().unwrap(), BroadcastBackend::Local);
        assert_eq!("redis".parse::<BroadcastBackend>().unwrap(), BroadcastBackend::Redis);
        assert!("kafka".parse::<BroadcastBackend>().is_err());
    }

    #[tokio::test]
    async fn every_member_receives_published_events() {
        let broadcaster = LocalBroadcaster::new();
        let group = GroupName::Conversation(1);
        let mut first = broadcaster.subscribe(group);
        let mut second = broadcaster.subscribe(group);
        let mut other = broadcaster.subscribe(GroupName::Conversation(2));

        broadcaster
            .publish(group, GroupEvent::from_user(3, pong()))
            .await
            .unwrap();

        assert_eq!(first.recv().await.unwrap().origin, Some(3));
        assert_eq!(second.recv().await.unwrap().origin, Some(3));
        assert!(other.receiver.as_mut().unwrap().try_recv().is_err());
    }

    #[tokio::test]
    async fn group_is_removed_with_last_member() {
        let broadcaster = LocalBroadcaster::new();
        let group = GroupName::User(7);
        let first = broadcaster.subscribe(group);
        let second = broadcaster.subscribe(group);
        assert_eq!(broadcaster.hub().member_count(group), 2);

        drop(first);
        assert!(broadcaster.hub().is_active(group));
        drop(second);
        assert!(!broadcaster.hub().is_active(group));

        // publishing to an empty group is fire-and-forget
        broadcaster
            .publish(group, GroupEvent::new(pong()))
            .await
            .unwrap();
    }
}
