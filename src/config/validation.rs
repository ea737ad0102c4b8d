use crate::config::types::{Config, CrawlerConfig, DownloadConfig, OutputConfig, UserAgentConfig};
use crate::url::parse_base_url;
use crate::ConfigError;

/// Upper bound for either phase's worker count
const MAX_CONCURRENCY: u32 = 256;

/// Smallest accepted write buffer
const MIN_CHUNK_SIZE: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_download_config(&config.download)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    parse_base_url(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    validate_concurrency("crawler.max-concurrency", config.max_concurrency)?;

    if config.range_end < 2 {
        return Err(ConfigError::Validation(format!(
            "crawler.range-end must be at least 2, got {}",
            config.range_end
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.timeout-secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    validate_concurrency("download.max-concurrency", config.max_concurrency)?;

    if config.chunk_size < MIN_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "download.chunk-size must be >= {} bytes, got {}",
            MIN_CHUNK_SIZE, config.chunk_size
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(
            "download.retries must be at least 1".to_string(),
        ));
    }

    if config.start_number < 1 {
        return Err(ConfigError::Validation(
            "download.start-number must be at least 1".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.probe_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "download timeouts must be at least 1 second".to_string(),
        ));
    }

    if config.save_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download.save-root cannot be empty".to_string(),
        ));
    }

    if config.max_consecutive_empty == Some(0) {
        return Err(ConfigError::Validation(
            "download.max-consecutive-empty must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.inventory_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output.inventory-path cannot be empty".to_string(),
        ));
    }

    if config.rename_plan_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output.rename-plan-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_concurrency(field: &str, value: u32) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            field, MAX_CONCURRENCY, value
        )));
    }
    Ok(())
}
