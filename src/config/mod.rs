//! Configuration module for galerts
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and holds the protocol tables that describe one version of the
//! service's markup.
//!
//! # Example
//!
//! ```no_run
//! use galerts::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("galerts.toml")).unwrap();
//! let protocol = config.protocol.resolve().unwrap();
//! println!("Protocol {} allows queries up to {}", protocol.name, protocol.max_query_len);
//! ```

mod parser;
mod protocol;
mod types;
mod validation;

// Re-export types
pub use protocol::{
    Choice, DeliveryCodes, FormFields, FormMarker, FrequencyTable, ListingLayout, LoginSeed,
    Paths, ProtocolConfig, SessionPropagation, SignInFlow, SignInProtocol, VolumeTable,
};
pub use types::{AccountConfig, Config, ProtocolSelection, ServiceConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_with_protocol, parse_config};
pub use validation::{validate_protocol, validate_service_config};
