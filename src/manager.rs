//! Alerts manager - the public entry point
//!
//! A manager owns one HTTP client, one protocol configuration and at most
//! one session. Every operation is a fixed sequence of awaited round trips;
//! listing is never cached, so each call to `list_alerts` fetches the
//! management page again.

use crate::alerts::{parse_listing, Alert, AlertListing, MutationCoordinator, NewAlert};
use crate::config::{
    validate_protocol, validate_service_config, Config, ProtocolConfig, ServiceConfig,
};
use crate::session::{Authenticator, Session, SessionStore};
use crate::transport::Transport;
use crate::AlertsError;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Manages the alerts of one account
pub struct AlertsManager {
    service: ServiceConfig,
    protocol: Arc<ProtocolConfig>,
    transport: Transport,
    store: SessionStore,
    /// Serializes fetch-token-then-submit sequences
    mutations: Mutex<()>,
}

impl AlertsManager {
    /// Creates a manager that is not signed in yet
    ///
    /// # Arguments
    ///
    /// * `service` - Endpoints and HTTP client settings
    /// * `protocol` - Field names, codes and layout of the service version
    ///
    /// # Returns
    ///
    /// * `Ok(AlertsManager)` - Manager ready for `sign_in`
    /// * `Err(AlertsError)` - Invalid configuration or HTTP client failure
    pub fn new(service: ServiceConfig, protocol: ProtocolConfig) -> Result<Self, AlertsError> {
        validate_service_config(&service)?;
        validate_protocol(&protocol)?;

        let transport = Transport::new(&service, protocol.session)?;
        tracing::debug!(
            "Manager for {} using protocol {}",
            service.base_url,
            protocol.name
        );

        Ok(Self {
            service,
            protocol: Arc::new(protocol),
            transport,
            store: SessionStore::new(),
            mutations: Mutex::new(()),
        })
    }

    /// Creates a manager from a loaded configuration file
    pub fn from_config(config: &Config) -> Result<Self, AlertsError> {
        let protocol = config.protocol.resolve()?;
        Self::new(config.service.clone(), protocol)
    }

    /// Signs in, replacing any previous session
    ///
    /// A bare account name gets the protocol's default domain appended.
    pub async fn sign_in(&mut self, account: &str, secret: &str) -> Result<(), AlertsError> {
        let session = Authenticator::new(&self.transport, &self.protocol)
            .sign_in(account, secret)
            .await?;
        self.store.establish(session);
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.store.is_signed_in()
    }

    /// The current session, or `NotSignedIn`
    pub fn session(&self) -> Result<&Session, AlertsError> {
        self.store.get()
    }

    /// Address the alerts are managed under
    pub fn email(&self) -> Result<&str, AlertsError> {
        Ok(self.store.get()?.email())
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    /// Fetches the management page and returns its alerts
    ///
    /// Every call issues a new request; alerts created, edited or deleted
    /// since the previous call only show up in a new listing.
    pub async fn list_alerts(&self) -> Result<AlertListing, AlertsError> {
        let session = self.store.get()?;
        let url = self.transport.service_url(&self.protocol.paths.manage)?;
        let page = self
            .transport
            .get(url, Some(session))
            .await?
            .expect_status(StatusCode::OK)?;

        parse_listing(page, Arc::clone(&self.protocol), session.email())
    }

    /// Creates an alert
    ///
    /// The service does not echo the new alert; list again to observe it.
    pub async fn create(&self, alert: &NewAlert) -> Result<(), AlertsError> {
        let session = self.store.get()?;
        let _guard = self.mutations.lock().await;
        self.coordinator(session).create(alert).await
    }

    /// Saves local changes to a listed alert
    pub async fn update(&self, alert: &Alert) -> Result<(), AlertsError> {
        let session = self.store.get()?;
        let _guard = self.mutations.lock().await;
        self.coordinator(session).update(alert).await
    }

    /// Deletes a listed alert
    pub async fn delete(&self, alert: Alert) -> Result<(), AlertsError> {
        let session = self.store.get()?;
        let _guard = self.mutations.lock().await;
        self.coordinator(session).delete(alert).await
    }

    fn coordinator<'a>(&'a self, session: &'a Session) -> MutationCoordinator<'a> {
        MutationCoordinator::new(&self.transport, session, &self.protocol)
    }
}

impl std::fmt::Debug for AlertsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertsManager")
            .field("base_url", &self.service.base_url)
            .field("protocol", &self.protocol.name)
            .field("session", &self.store.get().ok())
            .finish()
    }
}
