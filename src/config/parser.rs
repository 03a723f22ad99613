use crate::config::protocol::ProtocolConfig;
use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use galerts::config::load_config;
///
/// let config = load_config(Path::new("galerts.toml")).unwrap();
/// println!("Service: {}", config.service.base_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a configuration and resolves its protocol selection
pub fn load_config_with_protocol(path: &Path) -> Result<(Config, ProtocolConfig), ConfigError> {
    let config = load_config(path)?;
    let protocol = config.protocol.resolve()?;
    Ok((config, protocol))
}
