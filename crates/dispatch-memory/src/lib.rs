//! # dispatch-memory
//!
//! Durable storage for Dispatch (SQLite-backed) and the wizard session caches.

pub mod session_cache;
pub mod store;

pub use session_cache::{DurableSessionCache, MemorySessionCache};
pub use store::Store;
