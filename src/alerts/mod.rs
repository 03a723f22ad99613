//! Alerts module
//!
//! This module contains everything that deals with alerts themselves:
//! - The `Alert` entity and its value types
//! - `NewAlert` requests, validated before anything is sent
//! - Parsing the management page into an `AlertListing`
//! - Token fetching and the create/update/delete submissions

mod listing;
mod model;
mod mutation;
mod new_alert;
mod tokens;
mod validation;

pub(crate) use listing::parse_listing;
pub use listing::{AlertListing, Alerts};
pub use model::{Alert, Delivery, DeliveryChoice, Frequency, ResultType, Volume};
pub use mutation::MutationCoordinator;
pub use new_alert::{NewAlert, NewAlertBuilder};
pub use tokens::{EditTokens, Token, TokenFetcher};
pub use validation::validate_query;
