pub mod conversations;
pub mod groups;
pub mod messages;
pub mod notifications;
pub mod rooms;
pub mod sessions;
pub mod tweet_queue;
