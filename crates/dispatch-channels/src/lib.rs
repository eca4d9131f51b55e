//! # dispatch-channels
//!
//! Messaging platform integrations for Dispatch.

pub mod telegram;
pub(crate) mod utils;

pub use telegram::TelegramChannel;
