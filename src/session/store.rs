//! Session credential storage
//!
//! A manager owns exactly one store. It is filled by a successful sign-in
//! and dropped with the manager; nothing refreshes it.

use crate::AlertsError;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderValue;
use std::fmt;

/// An authenticated session with the service
///
/// The credential is opaque and is sent back exactly as it was received.
#[derive(Clone)]
pub struct Session {
    email: String,
    credential: HeaderValue,
    established_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(email: String, credential: HeaderValue) -> Self {
        let mut credential = credential;
        credential.set_sensitive(true);
        Self {
            email,
            credential,
            established_at: Utc::now(),
        }
    }

    /// The account address the session was established for
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The credential as a `Cookie` header value
    pub fn cookie_header(&self) -> &HeaderValue {
        &self.credential
    }

    /// When the sign-in completed
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// How long ago the sign-in completed
    ///
    /// Expiry is decided by the service and can only be observed as failed
    /// requests; this is for diagnostics.
    pub fn age(&self) -> Duration {
        Utc::now() - self.established_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("credential", &"<redacted>")
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// Holds the session of one manager
#[derive(Debug, Default)]
pub struct SessionStore {
    session: Option<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session, or `NotSignedIn`
    pub fn get(&self) -> Result<&Session, AlertsError> {
        self.session.as_ref().ok_or(AlertsError::NotSignedIn)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Installs the session produced by a sign-in, replacing any earlier one
    pub(crate) fn establish(&mut self, session: Session) {
        self.session = Some(session);
    }
}
