//! Configuration module for index-mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only the `[mirror]` table is required; every other table falls back to
//! defaults.
//!
//! # Example
//!
//! ```no_run
//! use index_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {} into {}", config.mirror.root_url, config.mirror.destination.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffStrategy, Config, CrawlerConfig, MirrorConfig, RetryConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
