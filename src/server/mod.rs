//! Server module for Devbox
//!
//! Contains the server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for the server and the engine
//! - `loader`: Configuration loading from files and environment
//! - `background_tasks`: Sweeper startup
//! - `init`: Router construction and the run loop

mod background_tasks;
pub mod config;
mod init;
mod loader;

// Re-export public API
pub use init::run;
pub use loader::{load_config, DEFAULT_CONFIG};
