//! Storage abstractions for users and sessions.

pub mod memory;
pub mod session;
pub mod user;

pub use memory::MemoryAuthStorage;
pub use session::SessionStore;
pub use user::{normalize_email, User, UserBuilder, UserStore};
