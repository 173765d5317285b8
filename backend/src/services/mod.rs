pub mod auth;
pub mod credentials;
pub mod session_cache;
pub mod session_store;
pub mod users;
