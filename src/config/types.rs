use crate::config::protocol::ProtocolConfig;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;

/// Main configuration structure for galerts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub protocol: ProtocolSelection,
}

/// Account defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
    /// Account identifier used when none is given on the command line
    pub email: Option<String>,
}

/// Where the service lives and how to talk to it
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL for the alert pages; plain HTTP is acceptable here
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Base URL for the sign-in endpoint; carries the password
    #[serde(rename = "identity-url", default = "default_identity_url")]
    pub identity_url: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout for each request; none by default
    #[serde(rename = "timeout-secs", default)]
    pub timeout_secs: Option<u64>,

    /// Permits a plain-HTTP identity URL (local test servers only)
    #[serde(rename = "allow-insecure-sign-in", default)]
    pub allow_insecure_sign_in: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            identity_url: default_identity_url(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            allow_insecure_sign_in: false,
        }
    }
}

impl ServiceConfig {
    /// Points both the alert pages and the sign-in endpoint at one server
    pub fn local(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            identity_url: base_url.to_string(),
            allow_insecure_sign_in: true,
            ..Self::default()
        }
    }
}

fn default_base_url() -> String {
    "http://www.google.com".to_string()
}

fn default_identity_url() -> String {
    "https://www.google.com".to_string()
}

fn default_user_agent() -> String {
    format!("galerts/{}", env!("CARGO_PKG_VERSION"))
}

/// The `[protocol]` table: a named preset or a full custom protocol
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProtocolSelection {
    Preset { preset: String },
    Custom(Box<ProtocolConfig>),
}

impl Default for ProtocolSelection {
    fn default() -> Self {
        Self::Preset {
            preset: "classic".to_string(),
        }
    }
}

impl ProtocolSelection {
    /// Resolves the selection into a concrete protocol configuration
    pub fn resolve(&self) -> ConfigResult<ProtocolConfig> {
        match self {
            Self::Preset { preset } => ProtocolConfig::preset(preset)
                .ok_or_else(|| ConfigError::UnknownPreset(preset.clone())),
            Self::Custom(protocol) => Ok((**protocol).clone()),
        }
    }
}
