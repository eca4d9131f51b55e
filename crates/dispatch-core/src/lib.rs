//! # dispatch-core
//!
//! Core domain types, traits, configuration, and error handling for Dispatch.

pub mod config;
pub mod debt;
pub mod error;
pub mod event;
pub mod input;
pub mod settlement;
pub mod task;
pub mod traits;

pub use config::shellexpand;
