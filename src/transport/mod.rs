//! Transport module
//!
//! HTTP plumbing shared by sign-in, listing and mutations:
//! - Building the HTTP client (no redirects, optional cookie store)
//! - GET and form POST requests with session propagation
//! - Charset-aware form encoding and strict page decoding

mod client;
mod encoding;

pub(crate) use client::header_value;
pub use client::{build_http_client, Page, Transport};
pub use encoding::{charset_of, decode_body, is_encodable, FormBody};
