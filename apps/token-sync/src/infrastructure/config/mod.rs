//! Configuration Module
//!
//! Configuration loading for the synchronization client.

mod settings;

pub use settings::{ConfigError, HttpSettings, StreamSettings, SyncConfig};
