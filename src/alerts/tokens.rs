//! Anti-forgery token fetching
//!
//! Every mutating form carries hidden values scraped from a page fetched
//! just before the submission. Tokens are single-use: they are moved into
//! the form that consumes them and are never cached.

use crate::config::ProtocolConfig;
use crate::markup;
use crate::session::Session;
use crate::transport::{Page, Transport};
use crate::AlertsError;
use reqwest::StatusCode;
use scraper::Html;

/// A hidden form value scraped from a page
#[derive(Debug, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

/// The tokens required to save an edited alert
#[derive(Debug)]
pub struct EditTokens {
    pub token: Token,
    pub first: Token,
    pub second: Token,
}

/// Fetches tokens with the current session
pub struct TokenFetcher<'a> {
    transport: &'a Transport,
    session: &'a Session,
    protocol: &'a ProtocolConfig,
}

impl<'a> TokenFetcher<'a> {
    pub fn new(
        transport: &'a Transport,
        session: &'a Session,
        protocol: &'a ProtocolConfig,
    ) -> Self {
        Self {
            transport,
            session,
            protocol,
        }
    }

    /// Fetches the form token from a page
    pub async fn fetch_token(&self, path: &str) -> Result<Token, AlertsError> {
        let url = self.transport.service_url(path)?;
        let page = self.fetch(url).await?;
        let mut values = extract(&page, &[&self.protocol.fields.token], self.protocol)?;
        Ok(Token(values.remove(0)))
    }

    /// Fetches the form token and both per-alert tokens from an edit page
    pub async fn fetch_edit_tokens(&self, handle: &str) -> Result<EditTokens, AlertsError> {
        let fields = &self.protocol.fields;
        let mut url = self.transport.service_url(&self.protocol.paths.edit)?;
        url.query_pairs_mut().append_pair(&fields.handle, handle);

        let page = self.fetch(url).await?;
        let names = [
            fields.token.as_str(),
            fields.edit_tokens[0].as_str(),
            fields.edit_tokens[1].as_str(),
        ];
        let mut values = extract(&page, &names, self.protocol)?.into_iter().map(Token);

        match (values.next(), values.next(), values.next()) {
            (Some(token), Some(first), Some(second)) => Ok(EditTokens {
                token,
                first,
                second,
            }),
            _ => Err(page.unexpected("edit page is missing tokens").into()),
        }
    }

    async fn fetch(&self, url: url::Url) -> Result<Page, AlertsError> {
        self.transport
            .get(url, Some(self.session))
            .await?
            .expect_status(StatusCode::OK)
    }
}

/// Reads the named hidden inputs, in order
fn extract(
    page: &Page,
    names: &[&str],
    protocol: &ProtocolConfig,
) -> Result<Vec<String>, AlertsError> {
    let text = page.text(protocol.encoding())?;
    let document = Html::parse_document(&text);

    names
        .iter()
        .map(|name| {
            markup::find_input(&document, name)
                .map_err(|e| AlertsError::from(page.unexpected(format!("token field: {}", e))))
        })
        .collect()
}
