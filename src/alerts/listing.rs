//! Alert listing parser
//!
//! The management page lists alerts as table rows. An address with no
//! alerts still gets a row, with a single cell saying so; such rows are
//! skipped and scanning continues, since rows for the account's other
//! addresses may follow.

use crate::alerts::model::{Alert, Delivery, ListedFields};
use crate::config::ProtocolConfig;
use crate::markup;
use crate::transport::Page;
use crate::AlertsError;
use scraper::Html;
use std::sync::Arc;

/// Raw cell values of one accepted row
#[derive(Debug, Clone)]
struct ListingRow {
    position: usize,
    handle: Option<String>,
    query: String,
    result_type: String,
    frequency: String,
    volume: Option<String>,
    delivery_text: String,
    delivery_href: Option<String>,
}

/// Alerts read from one fetch of the management page
///
/// Rows become `Alert`s lazily while iterating; a row the protocol cannot
/// interpret yields an error for that row only. The listing is a snapshot:
/// list again after a mutation to observe it.
#[derive(Debug)]
pub struct AlertListing {
    rows: Vec<ListingRow>,
    skipped: usize,
    page: Arc<Page>,
    protocol: Arc<ProtocolConfig>,
    owner_email: String,
}

impl AlertListing {
    /// Number of rows that look like alerts
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of placeholder rows that were skipped
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The page the listing was read from
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Collects every alert, failing on the first row that cannot be read
    pub fn into_alerts(self) -> Result<Vec<Alert>, AlertsError> {
        self.into_iter().collect()
    }
}

impl IntoIterator for AlertListing {
    type Item = Result<Alert, AlertsError>;
    type IntoIter = Alerts;

    fn into_iter(self) -> Self::IntoIter {
        Alerts {
            rows: self.rows.into_iter(),
            page: self.page,
            protocol: self.protocol,
            owner_email: self.owner_email,
        }
    }
}

/// Iterator over the alerts of a listing
#[derive(Debug)]
pub struct Alerts {
    rows: std::vec::IntoIter<ListingRow>,
    page: Arc<Page>,
    protocol: Arc<ProtocolConfig>,
    owner_email: String,
}

impl Iterator for Alerts {
    type Item = Result<Alert, AlertsError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(self.convert(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl Alerts {
    fn convert(&self, row: ListingRow) -> Result<Alert, AlertsError> {
        let protocol = &self.protocol;
        let position = row.position;
        let fail = |reason: String| -> AlertsError {
            self.page
                .unexpected(format!("listing row {}: {}", position, reason))
                .into()
        };

        let handle = row
            .handle
            .filter(|handle| !handle.is_empty())
            .ok_or_else(|| fail("no alert handle".to_string()))?;

        if row.query.is_empty() {
            return Err(fail("empty query".to_string()));
        }

        let result_type = protocol
            .result_type(&row.result_type)
            .ok_or_else(|| fail(format!("unknown result type '{}'", row.result_type)))?;

        let frequency = protocol
            .frequency(&row.frequency)
            .ok_or_else(|| fail(format!("unknown frequency '{}'", row.frequency)))?;

        let volume = match &row.volume {
            Some(label) => Some(
                protocol
                    .volume(label)
                    .ok_or_else(|| fail(format!("unknown volume '{}'", label)))?,
            ),
            None => None,
        };

        let delivery = if row.delivery_text == protocol.delivery.email_label {
            Delivery::Email {
                address: self.owner_email.clone(),
            }
        } else if let Some(url) = row.delivery_href {
            Delivery::Feed { url: Some(url) }
        } else {
            return Err(fail(format!(
                "delivery cell '{}' is neither email nor a feed link",
                row.delivery_text
            )));
        };

        Ok(Alert::from_listing(
            ListedFields {
                handle,
                query: row.query,
                result_type,
                frequency,
                volume,
                delivery,
            },
            &self.owner_email,
            Arc::clone(&self.protocol),
        ))
    }
}

/// Reads the alert rows of a management page
///
/// The owner address of every alert is the signed-in address: the page
/// does not reliably say which of the account's addresses owns a row.
pub(crate) fn parse_listing(
    page: Page,
    protocol: Arc<ProtocolConfig>,
    owner_email: &str,
) -> Result<AlertListing, AlertsError> {
    let text = page.text(protocol.encoding())?;
    let (rows, skipped) = scan_rows(&text, &protocol)
        .map_err(|e| AlertsError::from(page.unexpected(format!("listing rows: {}", e))))?;

    tracing::debug!("Listing has {} alert rows, {} skipped", rows.len(), skipped);

    Ok(AlertListing {
        rows,
        skipped,
        page: Arc::new(page),
        protocol,
        owner_email: owner_email.to_string(),
    })
}

fn scan_rows(
    text: &str,
    protocol: &ProtocolConfig,
) -> Result<(Vec<ListingRow>, usize), markup::MarkupError> {
    let layout = &protocol.listing;
    let document = Html::parse_document(text);

    let mut rows = Vec::new();
    let mut skipped = 0;

    for (position, row) in markup::find_all(&document, &layout.row_selector)?
        .iter()
        .enumerate()
    {
        let cells = markup::cells(row);
        if cells.len() < layout.min_cells {
            tracing::debug!("Skipping listing row {} with {} cells", position, cells.len());
            skipped += 1;
            continue;
        }

        let delivery = &cells[layout.delivery_column];
        rows.push(ListingRow {
            position,
            handle: markup::input_value(&cells[layout.handle_column]),
            query: markup::link_text(&cells[layout.query_column]),
            result_type: markup::text(&cells[layout.result_type_column]),
            frequency: markup::text(&cells[layout.frequency_column]),
            volume: layout
                .volume_column
                .map(|column| markup::text(&cells[column])),
            delivery_text: markup::text(delivery),
            delivery_href: markup::link_href(delivery),
        });
    }

    Ok((rows, skipped))
}
