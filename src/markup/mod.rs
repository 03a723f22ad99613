//! Markup extraction for service pages
//!
//! Thin locators over `scraper`: find the hidden form fields that carry
//! anti-forgery tokens, and pull text, links and input values out of table
//! cells. Nothing here performs I/O.

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised while locating elements in a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("No element matches {0}")]
    NotFound(String),

    #[error("{locator} matches elements with {count} different values")]
    Ambiguous { locator: String, count: usize },
}

/// Builds a CSS selector for an element kind and exact attribute matches
///
/// # Example
///
/// ```
/// use galerts::markup::locator;
///
/// assert_eq!(locator("input", &[("name", "sig")]).unwrap(), r#"input[name="sig"]"#);
/// ```
pub fn locator(element: &str, attrs: &[(&str, &str)]) -> Result<String, MarkupError> {
    let valid_name = |name: &str| {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };

    if !valid_name(element) {
        return Err(MarkupError::InvalidLocator(element.to_string()));
    }

    let mut css = element.to_string();
    for (name, value) in attrs {
        if !valid_name(name) {
            return Err(MarkupError::InvalidLocator(name.to_string()));
        }
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        css.push_str(&format!("[{}=\"{}\"]", name, escaped));
    }
    Ok(css)
}

fn selector(css: &str) -> Result<Selector, MarkupError> {
    Selector::parse(css).map_err(|e| MarkupError::InvalidLocator(format!("{}: {:?}", css, e)))
}

/// Returns the `value` attribute of the element matching the locator
///
/// Several matches are accepted when they all carry the same value, which is
/// how a page with more than one signed form looks. Matches that disagree
/// are ambiguous. An element without a `value` attribute does not count.
pub fn find(document: &Html, element: &str, attrs: &[(&str, &str)]) -> Result<String, MarkupError> {
    let css = locator(element, attrs)?;
    let selector = selector(&css)?;

    let values: BTreeSet<&str> = document
        .select(&selector)
        .filter_map(|found| found.value().attr("value"))
        .collect();

    let mut values = values.into_iter();
    match (values.next(), values.len()) {
        (None, _) => Err(MarkupError::NotFound(css)),
        (Some(value), 0) => Ok(value.to_string()),
        (Some(_), rest) => Err(MarkupError::Ambiguous {
            locator: css,
            count: rest + 1,
        }),
    }
}

/// Returns the value of the hidden input with the given name
pub fn find_input(document: &Html, name: &str) -> Result<String, MarkupError> {
    find(document, "input", &[("name", name)])
}

/// Returns every element matching a CSS selector
pub fn find_all<'a>(document: &'a Html, css: &str) -> Result<Vec<ElementRef<'a>>, MarkupError> {
    let selector = selector(css)?;
    Ok(document.select(&selector).collect())
}

/// Direct `td` children of a table row, in order
pub fn cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name().eq_ignore_ascii_case("td"))
        .collect()
}

/// Text content of an element with runs of whitespace collapsed
pub fn text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first link inside an element, or of the element itself
///
/// Whitespace inside the text is kept as written. Only the padding around a
/// bare cell is trimmed.
pub fn link_text(element: &ElementRef<'_>) -> String {
    match first_descendant(element, "a") {
        Some(link) => link.text().collect(),
        None => element.text().collect::<String>().trim().to_string(),
    }
}

/// Target of the first link inside an element
pub fn link_href(element: &ElementRef<'_>) -> Option<String> {
    first_descendant(element, "a[href]")
        .and_then(|link| link.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Value of the first input inside an element
pub fn input_value(element: &ElementRef<'_>) -> Option<String> {
    first_descendant(element, "input")
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

fn first_descendant<'a>(element: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element.select(&selector).next()
}
