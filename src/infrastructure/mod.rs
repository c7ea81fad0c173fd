//! Infrastructure layer - external adapters (export backend, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod backend;
pub mod config;

pub use backend::{BackendClient, TelegramCredentials};
pub use config::{ConfigStore, FileConfigStore};
