//! Charset handling for form bodies and service pages
//!
//! Form values are converted to the page charset before percent-encoding,
//! the way a browser submits a form. Sending UTF-8 to a Latin-1 page would
//! silently corrupt any non-ASCII query.

use crate::ValidationError;
use encoding_rs::Encoding;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use url::form_urlencoded::byte_serialize;

/// An `application/x-www-form-urlencoded` body in a fixed charset
#[derive(Debug, Clone)]
pub struct FormBody {
    encoding: &'static Encoding,
    pairs: Vec<(String, String)>,
}

impl FormBody {
    pub const CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            pairs: Vec::new(),
        }
    }

    /// Appends a field, builder style
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: &str, value: &str) -> &mut Self {
        self.pairs.push((name.to_string(), value.to_string()));
        self
    }

    /// Value of the first field with the given name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Serializes the body, rejecting values the charset cannot represent
    pub fn encode(&self) -> Result<String, ValidationError> {
        let mut body = String::new();
        for (name, value) in &self.pairs {
            if !body.is_empty() {
                body.push('&');
            }
            body.extend(byte_serialize(&encode_value(self.encoding, name, name)?));
            body.push('=');
            body.extend(byte_serialize(&encode_value(self.encoding, name, value)?));
        }
        Ok(body)
    }
}

fn encode_value(
    encoding: &'static Encoding,
    field: &str,
    value: &str,
) -> Result<Vec<u8>, ValidationError> {
    let (bytes, _, had_errors) = encoding.encode(value);
    if had_errors {
        return Err(ValidationError::NotEncodable {
            field: field.to_string(),
            charset: encoding.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Whether a value survives conversion to the given charset
pub fn is_encodable(encoding: &'static Encoding, value: &str) -> bool {
    !encoding.encode(value).2
}

/// The charset declared by a `Content-Type` header
pub fn charset_of(headers: &HeaderMap) -> Option<&'static Encoding> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Encoding::for_label(value.trim().trim_matches('"').as_bytes())
        } else {
            None
        }
    })
}

/// Decodes a body strictly; malformed input yields `None`
pub fn decode_body(body: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}
