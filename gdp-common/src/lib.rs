//! # GDP Common Library
//!
//! Shared code for the Grateful Dead song player:
//! - Configuration loading and resolution
//! - Event types (PlayerEvent) and the EventBus
//! - Server-Sent Events helpers
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
