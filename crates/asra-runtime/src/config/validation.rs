//! Configuration validation utilities.

use globset::Glob;

use super::error::{ConfigError, ConfigResult};
use super::schema::{AsraConfig, CredentialsConfig, EventsConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
///
/// Unknown log levels never get this far: they fail extraction.
pub fn validate_config(config: &AsraConfig) -> ConfigResult<()> {
    validate_events_config(&config.events)?;
    validate_credentials_config(&config.credentials)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_events_config(events: &EventsConfig) -> ConfigResult<()> {
    if events.client_dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("events.client_dir"));
    }
    if events.transport_dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("events.transport_dir"));
    }
    if events.client_dir == events.transport_dir {
        return Err(ConfigError::validation(format!(
            "Client and transport events share the directory {}",
            events.client_dir.display()
        )));
    }

    if events.pattern.is_empty() {
        return Err(ConfigError::missing_field("events.pattern"));
    }
    if let Err(e) = Glob::new(&events.pattern) {
        return Err(ConfigError::InvalidPattern {
            pattern: events.pattern.clone(),
            reason: e.kind().to_string(),
        });
    }

    Ok(())
}

fn validate_credentials_config(credentials: &CredentialsConfig) -> ConfigResult<()> {
    for (field, value) in [
        ("credentials.mode_var", &credentials.mode_var),
        ("credentials.production_var", &credentials.production_var),
        ("credentials.development_var", &credentials.development_var),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::missing_field(field));
        }
        if value.contains('=') || value.contains('\0') {
            return Err(ConfigError::validation(format!(
                "{field} is not a valid environment variable name: {value:?}"
            )));
        }
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(['=', ',', ' ']) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {target:?}"
            )));
        }
    }
    Ok(())
}
