//! HTTP transport for the alerts service
//!
//! Redirects are never followed: a mutation is acknowledged by the redirect
//! itself. Every response body is read to the end before it is returned, so
//! the connection goes back to the pool on success and on failure alike.

use crate::config::{ServiceConfig, SessionPropagation};
use crate::session::Session;
use crate::transport::encoding::{charset_of, decode_body, FormBody};
use crate::{AlertsError, UnexpectedResponse};
use encoding_rs::Encoding;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{redirect::Policy, Client, RequestBuilder, StatusCode};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client for the service
///
/// # Arguments
///
/// * `config` - The service configuration
/// * `propagation` - Whether the client should keep a cookie store
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &ServiceConfig,
    propagation: SessionPropagation,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::none())
        .cookie_store(propagation == SessionPropagation::CookieJar)
        .gzip(true)
        .brotli(true);

    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Page {
    /// Packages the page as an unexpected response with a reason
    pub fn unexpected(&self, reason: impl Into<String>) -> UnexpectedResponse {
        UnexpectedResponse {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            reason: reason.into(),
        }
    }

    /// Fails unless the page has the expected status
    pub fn expect_status(self, expected: StatusCode) -> Result<Self, AlertsError> {
        if self.status != expected {
            let reason = format!("expected status {}", expected.as_u16());
            return Err(self.unexpected(reason).into());
        }
        Ok(self)
    }

    /// Fails unless the page is a redirect
    pub fn expect_redirect(self) -> Result<Self, AlertsError> {
        if !self.status.is_redirection() {
            return Err(self.unexpected("expected a redirect").into());
        }
        Ok(self)
    }

    /// Decodes the body using the declared charset, or the fallback
    pub fn text(&self, fallback: &'static Encoding) -> Result<String, AlertsError> {
        let encoding = charset_of(&self.headers).unwrap_or(fallback);
        decode_body(&self.body, encoding).ok_or_else(|| {
            self.unexpected(format!("body is not valid {}", encoding.name()))
                .into()
        })
    }
}

/// Sends requests to the service and identity hosts
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base: Url,
    identity: Url,
    propagation: SessionPropagation,
}

impl Transport {
    pub fn new(
        config: &ServiceConfig,
        propagation: SessionPropagation,
    ) -> Result<Self, AlertsError> {
        let base = Url::parse(&config.base_url)?;
        let identity = Url::parse(&config.identity_url)?;
        let client =
            build_http_client(config, propagation).map_err(|source| AlertsError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base,
            identity,
            propagation,
        })
    }

    /// Resolves a path against the service base URL
    pub fn service_url(&self, path: &str) -> Result<Url, AlertsError> {
        Ok(self.base.join(path)?)
    }

    /// Resolves a path against the identity base URL
    pub fn identity_url(&self, path: &str) -> Result<Url, AlertsError> {
        Ok(self.identity.join(path)?)
    }

    pub async fn get(&self, url: Url, session: Option<&Session>) -> Result<Page, AlertsError> {
        tracing::debug!("GET {}", url);
        let request = self.client.get(url.clone());
        self.send(self.authenticate(request, session), url).await
    }

    pub async fn post_form(
        &self,
        url: Url,
        session: Option<&Session>,
        form: &FormBody,
    ) -> Result<Page, AlertsError> {
        let body = form.encode()?;
        tracing::debug!("POST {}", url);
        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, FormBody::CONTENT_TYPE)
            .body(body);
        self.send(self.authenticate(request, session), url).await
    }

    fn authenticate(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        match (self.propagation, session) {
            (SessionPropagation::Header, Some(session)) => {
                request.header(COOKIE, session.cookie_header().clone())
            }
            // The cookie store attaches the session by itself
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: Url) -> Result<Page, AlertsError> {
        let transport_error = |source| AlertsError::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        tracing::debug!("{} -> {}", url, status);

        Ok(Page {
            url: url.to_string(),
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Header value for a session credential, if it is representable
pub(crate) fn header_value(credential: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(credential).ok()
}
