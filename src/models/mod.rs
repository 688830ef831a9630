pub mod brands;
pub mod conversations;
pub mod frames;
pub mod messages;
pub mod sessions;
pub mod users;
