use crate::config::types::{Config, CrawlerConfig, HttpConfig, MarkupConfig, OutputConfig};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_markup_config(&config.markup)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_step < 1 {
        return Err(ConfigError::Validation(
            "page_step must be >= 1, got 0".to_string(),
        ));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(
            "retries must be >= 1, got 0".to_string(),
        ));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be > 0".to_string(),
        ));
    }

    if config.min_page_delay_ms > config.max_page_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_page_delay_ms ({}ms) cannot exceed max_page_delay_ms ({}ms)",
            config.min_page_delay_ms, config.max_page_delay_ms
        )));
    }

    let suffix = config.listing_suffix.trim_matches('/');
    if suffix.is_empty() {
        return Err(ConfigError::Validation(
            "listing_suffix cannot be empty".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates request header configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if !is_header_safe(&config.user_agent) {
        return Err(ConfigError::Validation(format!(
            "user_agent contains characters not allowed in a header: '{}'",
            config.user_agent
        )));
    }

    if let Some(language) = &config.accept_language {
        if !is_header_safe(language) {
            return Err(ConfigError::Validation(format!(
                "accept_language contains characters not allowed in a header: '{}'",
                language
            )));
        }
    }

    Ok(())
}

/// Validates the listing markup description
fn validate_markup_config(config: &MarkupConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("entry_selector", &config.entry_selector),
        ("tag_selector", &config.tag_selector),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e))
        })?;
    }

    if config.tag_attribute.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tag_attribute cannot be empty".to_string(),
        ));
    }

    validate_capturing_pattern("caption_pattern", &config.caption_pattern)
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "progress_path cannot be empty".to_string(),
        ));
    }

    if config.records_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "records_dir cannot be empty".to_string(),
        ));
    }

    validate_capturing_pattern("identity_pattern", &config.identity_pattern)
}

/// Validates a regex that must compile and contain a capture group
fn validate_capturing_pattern(name: &str, pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "{} cannot be empty",
            name
        )));
    }

    let regex = Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("{} '{}': {}", name, pattern, e)))?;

    // Group 0 is the whole match
    if regex.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern(format!(
            "{} '{}' must contain a capture group",
            name, pattern
        )));
    }

    Ok(())
}

/// Visible ASCII plus spaces, as accepted in a header value
fn is_header_safe(value: &str) -> bool {
    value.chars().all(|c| c == ' ' || c.is_ascii_graphic())
}
