//! Configuration module for linkrot
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line flags are layered over these values by the binary.
//!
//! # Example
//!
//! ```no_run
//! use linkrot::config::load_config;
//! use std::path::Path;
//!
//! let options = load_config(Path::new("linkrot.toml")).unwrap();
//! println!("Max redirections: {}", options.fetcher.max_redirections);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_user_agent, CheckerOptions, FetcherOptions, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_REDIRECTIONS, DEFAULT_TIMEOUT,
};

pub use parser::{load_config, parse_config};
pub use validation::validate;
