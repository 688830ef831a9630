pub mod brands;
pub mod chat_rooms;
pub mod conversations;
pub mod messages;
pub mod sessions;
pub mod users;
