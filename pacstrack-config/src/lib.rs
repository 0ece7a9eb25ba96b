//! Configuration for the pacstrack client: where the server lives, how often
//! to poll it, and where persisted views are kept.

pub mod client;
pub mod error;

pub use client::{ClientConfig, ConfigSource};
pub use error::ConfigLoadError;
