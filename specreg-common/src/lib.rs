//! # specreg Common Library
//!
//! Shared code for the specreg services including:
//! - Error types (`Error` enum, `Result` alias)
//! - Event types (`ImportEvent` enum) and the `EventBus`
//! - Configuration loading and root folder resolution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
