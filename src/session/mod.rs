//! Session module
//!
//! - `Authenticator`: performs the sign-in handshake
//! - `Session`: the opaque credential it yields
//! - `SessionStore`: holds the session for the lifetime of a manager

mod auth;
mod store;

pub use auth::{normalize_account, Authenticator};
pub use store::{Session, SessionStore};
