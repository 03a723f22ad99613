use crate::config::protocol::{Choice, ProtocolConfig, SignInFlow};
use crate::config::types::{Config, ServiceConfig};
use crate::ConfigError;
use encoding_rs::Encoding;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    let protocol = config.protocol.resolve()?;
    validate_protocol(&protocol)?;
    Ok(())
}

/// Validates the service endpoints
pub fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must be http or https, got '{}'",
            config.base_url
        )));
    }

    let identity = Url::parse(&config.identity_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid identity-url: {}", e)))?;

    // The sign-in request carries the password
    if identity.scheme() != "https" && !config.allow_insecure_sign_in {
        return Err(ConfigError::Validation(format!(
            "identity-url '{}' must use HTTPS",
            config.identity_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "timeout-secs must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a protocol configuration
pub fn validate_protocol(protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    if protocol.max_query_len == 0 {
        return Err(ConfigError::Validation(
            "max-query-len must be at least 1".to_string(),
        ));
    }

    if Encoding::for_label(protocol.charset.as_bytes()).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unknown charset '{}'",
            protocol.charset
        )));
    }

    validate_paths(protocol)?;
    validate_sign_in(protocol)?;
    validate_listing(protocol)?;

    if protocol.result_types.is_empty() {
        return Err(ConfigError::Validation(
            "result-types cannot be empty".to_string(),
        ));
    }
    validate_choices("result-types", &protocol.result_types)?;

    let frequencies = &protocol.frequencies;
    validate_choices(
        "frequencies",
        &[
            frequencies.as_it_happens.clone(),
            frequencies.once_a_day.clone(),
            frequencies.once_a_week.clone(),
        ],
    )?;

    if let Some(volumes) = &protocol.volumes {
        if volumes.field.is_empty() {
            return Err(ConfigError::Validation(
                "volumes.field cannot be empty".to_string(),
            ));
        }
        validate_choices("volumes", &[volumes.only_best.clone(), volumes.all.clone()])?;
    }

    if protocol.fields.token.is_empty() {
        return Err(ConfigError::Validation(
            "fields.token cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_paths(protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    let paths = &protocol.paths;
    for (name, path) in [
        ("create-form", &paths.create_form),
        ("manage", &paths.manage),
        ("edit", &paths.edit),
        ("create", &paths.create),
        ("save", &paths.save),
        ("sign-in.path", &protocol.sign_in.path),
    ] {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Path {} must start with '/', got '{}'",
                name, path
            )));
        }
    }
    Ok(())
}

fn validate_sign_in(protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    let sign_in = &protocol.sign_in;

    if sign_in.flow == SignInFlow::SeededLogin && sign_in.seed.is_none() {
        return Err(ConfigError::Validation(
            "seeded-login flow requires a sign-in.seed table".to_string(),
        ));
    }

    if sign_in.success_status == sign_in.rejected_status {
        return Err(ConfigError::Validation(format!(
            "sign-in success and rejected status are both {}",
            sign_in.success_status
        )));
    }

    if sign_in.default_domain.is_empty() || sign_in.default_domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid sign-in default-domain '{}'",
            sign_in.default_domain
        )));
    }

    Ok(())
}

fn validate_listing(protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    let listing = &protocol.listing;

    if scraper::Selector::parse(&listing.row_selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "Invalid listing row-selector '{}'",
            listing.row_selector
        )));
    }

    let columns = listing.columns();
    if let Some(highest) = columns.iter().max() {
        if listing.min_cells <= *highest {
            return Err(ConfigError::Validation(format!(
                "listing min-cells {} does not cover column {}",
                listing.min_cells, highest
            )));
        }
    }

    let unique: HashSet<_> = columns.iter().collect();
    if unique.len() != columns.len() {
        return Err(ConfigError::Validation(
            "listing columns must be distinct".to_string(),
        ));
    }

    if listing.volume_column.is_some() != protocol.volumes.is_some() {
        return Err(ConfigError::Validation(
            "listing volume-column and volumes table must be configured together".to_string(),
        ));
    }

    Ok(())
}

fn validate_choices(table: &str, choices: &[Choice]) -> Result<(), ConfigError> {
    let mut labels = HashSet::new();
    for choice in choices {
        if choice.label.trim().is_empty() || choice.code.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} entries need a label and a code",
                table
            )));
        }
        if !labels.insert(choice.label.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate label '{}' in {}",
                choice.label, table
            )));
        }
    }
    Ok(())
}
