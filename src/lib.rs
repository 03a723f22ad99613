//! galerts: a scraping client for managing Google Alerts
//!
//! The alerts service has no public API, so this crate signs in as the
//! account owner, reads the server-rendered management pages and submits the
//! same forms the web interface does. Every field name, code and column
//! position the service expects lives in a [`config::ProtocolConfig`] so a
//! markup change on the remote side is a configuration change here.
//!
//! ```no_run
//! use galerts::config::{ProtocolConfig, ServiceConfig};
//! use galerts::{AlertsManager, DeliveryChoice, NewAlert};
//!
//! # async fn example() -> galerts::Result<()> {
//! let mut manager = AlertsManager::new(ServiceConfig::default(), ProtocolConfig::classic())?;
//! manager.sign_in("someone", "secret").await?;
//!
//! let request = NewAlert::builder("market volatility", "News")
//!     .delivery(DeliveryChoice::Feed)
//!     .build(manager.protocol())?;
//! manager.create(&request).await?;
//!
//! for alert in manager.list_alerts().await? {
//!     println!("{}", alert?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod manager;
pub mod markup;
pub mod session;
pub mod transport;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for alert management operations
#[derive(Debug, Error)]
pub enum AlertsError {
    #[error("Sign in rejected: bad account/password combination?")]
    InvalidCredentials,

    #[error("{0}")]
    UnexpectedResponse(Box<UnexpectedResponse>),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Invalid alert: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

impl AlertsError {
    /// Returns the diagnostic payload when the remote answered unexpectedly
    pub fn unexpected_response(&self) -> Option<&UnexpectedResponse> {
        match self {
            Self::UnexpectedResponse(response) => Some(response.as_ref()),
            _ => None,
        }
    }
}

/// Everything the service sent back when a response could not be classified
///
/// Kept whole so a caller can inspect it offline and tell a transient
/// failure from a change in the service's markup.
#[derive(Debug, Clone)]
pub struct UnexpectedResponse {
    /// URL of the request that produced the response
    pub url: String,

    /// HTTP status code
    pub status: StatusCode,

    /// Response headers
    pub headers: HeaderMap,

    /// Raw response body
    pub body: Vec<u8>,

    /// Why the response was rejected
    pub reason: String,
}

impl UnexpectedResponse {
    /// The body decoded lossily, for display only
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl std::fmt::Display for UnexpectedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unexpected response from {} ({}): {}",
            self.url, self.status, self.reason
        )
    }
}

impl From<UnexpectedResponse> for AlertsError {
    fn from(response: UnexpectedResponse) -> Self {
        Self::UnexpectedResponse(Box::new(response))
    }
}

/// Local precondition failures, raised before any request is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("query is {len} characters long, the maximum is {max}")]
    QueryTooLong { len: usize, max: usize },

    #[error("{field} cannot be represented in the page charset {charset}")]
    NotEncodable { field: String, charset: String },

    #[error("unknown result type '{0}'")]
    UnknownResultType(String),

    #[error("this protocol has no volume setting")]
    VolumeNotSupported,

    #[error("unknown volume '{0}'")]
    UnknownVolume(String),

    #[error("unknown frequency '{0}'")]
    UnknownFrequency(String),

    #[error("unknown delivery method '{0}'")]
    UnknownDelivery(String),

    #[error("frequency only applies to email delivery")]
    FrequencyRequiresEmail,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown protocol preset: {0}")]
    UnknownPreset(String),
}

/// Result type alias for alert management operations
pub type Result<T> = std::result::Result<T, AlertsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use alerts::{
    Alert, AlertListing, Delivery, DeliveryChoice, Frequency, NewAlert, ResultType, Volume,
};
pub use config::Config;
pub use manager::AlertsManager;
pub use session::Session;
