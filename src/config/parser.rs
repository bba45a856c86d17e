use crate::config::types::CheckerOptions;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Every key is optional; missing keys fall back to [`CheckerOptions::default`].
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(CheckerOptions)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use linkrot::config::load_config;
///
/// let options = load_config(Path::new("linkrot.toml")).unwrap();
/// println!("Concurrency: {}", options.fetcher.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<CheckerOptions, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<CheckerOptions, ConfigError> {
    let options: CheckerOptions = toml::from_str(content)?;

    validate(&options)?;

    Ok(options)
}
