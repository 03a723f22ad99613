//! Sign-in handshake
//!
//! Two flows have been in use:
//!
//! | Flow | Requests | Credential |
//! |------|----------|------------|
//! | `client-login` | POST identity + password | response body, one `name=value` per line |
//! | `seeded-login` | GET login page, POST with its seed | `Set-Cookie` of the POST response |
//!
//! The rejected status maps to `InvalidCredentials`; any other status than
//! the configured success status is an unexpected response.

use crate::config::{LoginSeed, ProtocolConfig, SignInFlow};
use crate::markup;
use crate::session::Session;
use crate::transport::{header_value, FormBody, Page, Transport};
use crate::{AlertsError, ConfigError};
use reqwest::header::SET_COOKIE;
use reqwest::StatusCode;
use scraper::Html;

/// Appends the default domain to an identifier without one
///
/// # Example
///
/// ```
/// use galerts::session::normalize_account;
///
/// assert_eq!(normalize_account("someone", "gmail.com"), "someone@gmail.com");
/// assert_eq!(normalize_account("a@b.org", "gmail.com"), "a@b.org");
/// ```
pub fn normalize_account(account: &str, default_domain: &str) -> String {
    let account = account.trim();
    if account.contains('@') {
        account.to_string()
    } else {
        format!("{}@{}", account, default_domain)
    }
}

/// Performs the sign-in handshake for one protocol
pub struct Authenticator<'a> {
    transport: &'a Transport,
    protocol: &'a ProtocolConfig,
}

impl<'a> Authenticator<'a> {
    pub fn new(transport: &'a Transport, protocol: &'a ProtocolConfig) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    /// Signs in and returns the resulting session
    ///
    /// The password is only ever sent to the identity URL.
    pub async fn sign_in(&self, account: &str, secret: &str) -> Result<Session, AlertsError> {
        let sign_in = &self.protocol.sign_in;
        let email = normalize_account(account, &sign_in.default_domain);
        tracing::info!("Signing in as {} ({})", email, self.protocol.name);

        let mut form = FormBody::new(self.protocol.encoding())
            .field(&sign_in.email_field, &email)
            .field(&sign_in.password_field, secret)
            .field(&sign_in.service_field, &sign_in.service);

        if sign_in.flow == SignInFlow::SeededLogin {
            let seed = sign_in.seed.as_ref().ok_or_else(|| {
                ConfigError::Validation("seeded-login flow without a seed table".to_string())
            })?;
            let value = self.fetch_seed(seed).await?;
            form.push(&seed.field, &value);
        }

        let url = self.transport.identity_url(&sign_in.path)?;
        let page = self.transport.post_form(url, None, &form).await?;
        let session = self.classify(page, email)?;

        tracing::info!("Signed in as {}", session.email());
        Ok(session)
    }

    /// Reads the seed value from the login page
    ///
    /// The service accepts a sign-in without the seed, so a page that lacks
    /// it is logged and an empty value is sent.
    async fn fetch_seed(&self, seed: &LoginSeed) -> Result<String, AlertsError> {
        let url = self.transport.identity_url(&seed.page)?;
        let page = self
            .transport
            .get(url, None)
            .await?
            .expect_status(StatusCode::OK)?;

        match extract_seed(&page, &seed.field, self.protocol) {
            Ok(value) => Ok(value),
            Err(reason) => {
                tracing::warn!(
                    "Login seed '{}' unavailable ({}), continuing without it",
                    seed.field,
                    reason
                );
                Ok(String::new())
            }
        }
    }

    fn classify(&self, page: Page, email: String) -> Result<Session, AlertsError> {
        let sign_in = &self.protocol.sign_in;
        let status = page.status.as_u16();

        if status == sign_in.rejected_status {
            return Err(AlertsError::InvalidCredentials);
        }
        if status != sign_in.success_status {
            let reason = format!("expected sign-in status {}", sign_in.success_status);
            return Err(page.unexpected(reason).into());
        }

        let credential = match sign_in.flow {
            SignInFlow::ClientLogin => {
                let body = page.text(self.protocol.encoding())?;
                credential_from_body(&body)
            }
            SignInFlow::SeededLogin => credential_from_cookies(&page),
        };

        if credential.is_empty() {
            return Err(page.unexpected("sign-in response carried no session").into());
        }

        let credential = header_value(&credential)
            .ok_or_else(|| page.unexpected("session credential is not a valid header value"))?;

        Ok(Session::new(email, credential))
    }
}

fn extract_seed(page: &Page, field: &str, protocol: &ProtocolConfig) -> Result<String, String> {
    let text = page.text(protocol.encoding()).map_err(|e| e.to_string())?;
    let document = Html::parse_document(&text);
    markup::find_input(&document, field).map_err(|e| e.to_string())
}

/// One `name=value` pair per body line, joined as a cookie header
fn credential_from_body(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The `name=value` pair of every `Set-Cookie`, joined as a cookie header
fn credential_from_cookies(page: &Page) -> String {
    page.headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
