use crate::adapters::media::MediaStorage;
use crate::common::encryption::MessageCipher;
use crate::repositories::groups::Broadcaster;
use crate::repositories::sessions::SessionStore;
use crate::repositories::ChatStore;
use std::time::Duration;

/// Capabilities every use case runs against.
pub trait Context: Sync + Send {
    fn store(&self) -> &dyn ChatStore;
    fn sessions(&self) -> &dyn SessionStore;
    fn broadcaster(&self) -> &dyn Broadcaster;
    fn cipher(&self) -> &MessageCipher;
    fn media(&self) -> &MediaStorage;
    fn session_timeout(&self) -> Duration;
}
