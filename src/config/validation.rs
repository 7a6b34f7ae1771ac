use std::collections::HashSet;

use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_stream_config(config)?;
    validate_render_config(config)?;
    validate_attachment_tags(config)?;
    validate_providers(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_stream_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.stream.read_buffer_size == 0 {
        return Err(validation_err(
            "stream.read_buffer_size must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_render_config(config: &AppConfig) -> Result<(), ConfigError> {
    let render = &config.render;
    if render.large_message_threshold == 0 {
        return Err(validation_err(
            "render.large_message_threshold must be greater than 0",
        ));
    }
    if render.large_message_preview == 0 {
        return Err(validation_err(
            "render.large_message_preview must be greater than 0",
        ));
    }
    if render.large_message_preview > render.large_message_threshold {
        return Err(validation_err(format!(
            "render.large_message_preview ({}) must not exceed render.large_message_threshold ({})",
            render.large_message_preview, render.large_message_threshold
        )));
    }
    if render.debounce_ms > 1_000 {
        return Err(validation_err(
            "render.debounce_ms must be at most 1000",
        ));
    }
    Ok(())
}

fn validate_attachment_tags(config: &AppConfig) -> Result<(), ConfigError> {
    let tags = &config.attachments;
    let fields = [
        ("image_tag_start", &tags.image_tag_start),
        ("image_tag_end", &tags.image_tag_end),
        ("file_tag_start", &tags.file_tag_start),
        ("file_tag_end", &tags.file_tag_end),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(validation_err(format!(
                "attachments.{name} cannot be empty"
            )));
        }
        if value.contains('\n') {
            return Err(validation_err(format!(
                "attachments.{name} cannot contain a newline"
            )));
        }
    }
    if tags.image_tag_start == tags.file_tag_start {
        return Err(validation_err(
            "attachments.image_tag_start and attachments.file_tag_start must differ",
        ));
    }
    Ok(())
}

fn validate_providers(config: &AppConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for provider in &config.providers {
        if provider.name.trim().is_empty() {
            return Err(validation_err("provider name cannot be empty"));
        }
        if !names.insert(provider.name.as_str()) {
            return Err(validation_err(format!(
                "duplicate provider name '{}'",
                provider.name
            )));
        }
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}
