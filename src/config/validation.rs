use crate::config::types::{CheckerOptions, FetcherOptions};
use crate::ConfigError;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use std::time::Duration;

/// Validates the entire configuration
pub fn validate(options: &CheckerOptions) -> Result<(), ConfigError> {
    validate_fetcher_options(&options.fetcher)?;

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(path) = &options.ca_cert {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "ca_cert cannot be an empty path".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_options(options: &FetcherOptions) -> Result<(), ConfigError> {
    if options.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be >= 1, got {}",
            options.concurrency
        )));
    }

    if options.timeout == Duration::ZERO {
        return Err(ConfigError::Validation(
            "timeout must be greater than zero".to_string(),
        ));
    }

    for pattern in &options.excluded_patterns {
        validate_pattern(pattern)?;
    }

    for (name, value) in &options.headers {
        validate_header(name, value)?;
    }

    Ok(())
}

/// Validates that an exclusion pattern compiles
fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Validates that a header can actually be put on the wire
fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;

    HeaderValue::from_str(value).map_err(|_| {
        ConfigError::Validation(format!("Invalid value for header '{}'", name))
    })?;

    Ok(())
}
