pub mod context;
pub mod encryption;
pub mod env;
pub mod error;
pub mod init;
pub mod redis_pool;
pub mod state;
