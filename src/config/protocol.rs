//! Protocol version tables
//!
//! The service's form field names, enumerated codes, endpoint paths and
//! listing columns have changed several times. All of them are collected
//! here so the engine never carries a literal from the remote markup.

use crate::alerts::{Frequency, ResultType, Volume};
use encoding_rs::{Encoding, UTF_8};
use serde::Deserialize;

/// A label shown by the service paired with the code it expects back
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub label: String,
    pub code: String,
}

impl Choice {
    fn new(label: &str, code: &str) -> Self {
        Self {
            label: label.to_string(),
            code: code.to_string(),
        }
    }
}

/// A fixed name/value pair submitted alongside a form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormMarker {
    pub name: String,
    pub value: String,
}

impl FormMarker {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// How the sign-in handshake is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignInFlow {
    /// One POST; the session credential is the response body
    ClientLogin,
    /// Fetch the login page for a seed value, then POST; the credential is
    /// carried by `Set-Cookie`
    SeededLogin,
}

/// How the session credential travels with later requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPropagation {
    /// An explicit `Cookie` header built from the credential
    Header,
    /// The HTTP client's cookie store
    CookieJar,
}

/// Hidden field on the login page that is echoed back on sign-in
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginSeed {
    pub page: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SignInProtocol {
    pub flow: SignInFlow,
    pub path: String,
    pub service: String,
    /// Appended to account identifiers without an `@`
    pub default_domain: String,
    pub success_status: u16,
    pub rejected_status: u16,
    pub email_field: String,
    pub password_field: String,
    pub service_field: String,
    #[serde(default)]
    pub seed: Option<LoginSeed>,
}

/// Endpoint paths, relative to the service base URL
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Paths {
    /// Page carrying the token for a create
    pub create_form: String,
    /// Alert listing; also carries the token for a delete
    pub manage: String,
    /// Per-alert edit page; the handle is appended as a query parameter
    pub edit: String,
    pub create: String,
    /// Shared by update and delete
    pub save: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FormFields {
    /// Hidden anti-forgery field present on every form
    pub token: String,
    /// The two per-alert hidden fields of the edit page
    pub edit_tokens: [String; 2],
    pub handle: String,
    pub query: String,
    pub email: String,
    pub result_type: String,
    pub frequency: String,
    pub delivery: String,
    pub save: FormMarker,
    pub delete: FormMarker,
}

/// Where each alert attribute sits in a listing row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingLayout {
    /// CSS selector for data rows
    pub row_selector: String,
    /// Rows with fewer cells are placeholders and are skipped
    pub min_cells: usize,
    pub handle_column: usize,
    pub query_column: usize,
    pub result_type_column: usize,
    pub frequency_column: usize,
    #[serde(default)]
    pub volume_column: Option<usize>,
    pub delivery_column: usize,
}

impl ListingLayout {
    /// All configured column indices
    pub fn columns(&self) -> Vec<usize> {
        let mut columns = vec![
            self.handle_column,
            self.query_column,
            self.result_type_column,
            self.frequency_column,
            self.delivery_column,
        ];
        columns.extend(self.volume_column);
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FrequencyTable {
    pub as_it_happens: Choice,
    pub once_a_day: Choice,
    pub once_a_week: Choice,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VolumeTable {
    pub field: String,
    pub only_best: Choice,
    pub all: Choice,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliveryCodes {
    /// Text of the delivery cell for email alerts
    pub email_label: String,
    pub email_code: String,
    pub feed_code: String,
    /// Sent in place of an address when creating a feed alert
    pub feed_marker: String,
}

/// One version of the service's form and markup conventions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProtocolConfig {
    pub name: String,
    /// Charset of the service pages and of submitted forms
    pub charset: String,
    pub max_query_len: usize,
    pub sign_in: SignInProtocol,
    pub session: SessionPropagation,
    pub paths: Paths,
    pub fields: FormFields,
    pub listing: ListingLayout,
    pub result_types: Vec<Choice>,
    pub frequencies: FrequencyTable,
    #[serde(default)]
    pub volumes: Option<VolumeTable>,
    pub delivery: DeliveryCodes,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl ProtocolConfig {
    /// Looks up a built-in protocol by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "revised" => Some(Self::revised()),
            _ => None,
        }
    }

    /// ClientLogin sign-in, `Cookie` header sessions, `sig` tokens
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            charset: "utf-8".to_string(),
            max_query_len: 256,
            sign_in: SignInProtocol {
                flow: SignInFlow::ClientLogin,
                path: "/accounts/ClientLogin".to_string(),
                service: "alerts".to_string(),
                default_domain: "gmail.com".to_string(),
                success_status: 200,
                rejected_status: 403,
                email_field: "Email".to_string(),
                password_field: "Passwd".to_string(),
                service_field: "service".to_string(),
                seed: None,
            },
            session: SessionPropagation::Header,
            paths: Paths {
                create_form: "/alerts".to_string(),
                manage: "/alerts/manage?hl=en&gl=us".to_string(),
                edit: "/alerts/edit?hl=en&gl=us".to_string(),
                create: "/alerts/create?hl=en&gl=us".to_string(),
                save: "/alerts/save?hl=en&gl=us".to_string(),
            },
            fields: FormFields {
                token: "sig".to_string(),
                edit_tokens: ["es".to_string(), "hps".to_string()],
                handle: "s".to_string(),
                query: "q".to_string(),
                email: "e".to_string(),
                result_type: "t".to_string(),
                frequency: "f".to_string(),
                delivery: "d".to_string(),
                save: FormMarker::new("se", "Save"),
                delete: FormMarker::new("da", "Delete"),
            },
            listing: ListingLayout {
                row_selector: "tr.data_row".to_string(),
                min_cells: 5,
                handle_column: 0,
                query_column: 1,
                result_type_column: 2,
                delivery_column: 3,
                frequency_column: 4,
                volume_column: None,
            },
            result_types: vec![
                Choice::new("News", "1"),
                Choice::new("Blogs", "4"),
                Choice::new("Web", "2"),
                Choice::new("Comprehensive", "7"),
                Choice::new("Video", "9"),
                Choice::new("Groups", "8"),
            ],
            frequencies: FrequencyTable {
                as_it_happens: Choice::new("as-it-happens", "0"),
                once_a_day: Choice::new("once a day", "1"),
                once_a_week: Choice::new("once a week", "6"),
            },
            volumes: None,
            delivery: DeliveryCodes {
                email_label: "Email".to_string(),
                email_code: "0".to_string(),
                feed_code: "6".to_string(),
                feed_marker: "feed".to_string(),
            },
        }
    }

    /// Seeded login, cookie-jar sessions, `x` tokens and a volume setting
    pub fn revised() -> Self {
        let classic = Self::classic();
        Self {
            name: "revised".to_string(),
            max_query_len: 2048,
            sign_in: SignInProtocol {
                flow: SignInFlow::SeededLogin,
                path: "/accounts/ServiceLoginAuth".to_string(),
                success_status: 302,
                seed: Some(LoginSeed {
                    page: "/accounts/ServiceLogin?service=alerts".to_string(),
                    field: "GALX".to_string(),
                }),
                ..classic.sign_in
            },
            session: SessionPropagation::CookieJar,
            fields: FormFields {
                token: "x".to_string(),
                ..classic.fields
            },
            listing: ListingLayout {
                row_selector: "tr.data_row".to_string(),
                min_cells: 6,
                handle_column: 0,
                query_column: 1,
                result_type_column: 2,
                frequency_column: 3,
                volume_column: Some(4),
                delivery_column: 5,
            },
            result_types: vec![
                Choice::new("Everything", "7"),
                Choice::new("News", "1"),
                Choice::new("Blogs", "4"),
                Choice::new("Video", "9"),
                Choice::new("Discussions", "8"),
                Choice::new("Realtime", "20"),
            ],
            volumes: Some(VolumeTable {
                field: "r".to_string(),
                only_best: Choice::new("Only the best results", "0"),
                all: Choice::new("All results", "1"),
            }),
            ..classic
        }
    }

    /// The page charset, falling back to UTF-8 for unknown labels
    pub fn encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.charset.as_bytes()).unwrap_or(UTF_8)
    }

    /// Whether alerts of this protocol carry a volume setting
    pub fn supports_volume(&self) -> bool {
        self.volumes.is_some()
    }

    pub fn result_type(&self, label: &str) -> Option<ResultType> {
        self.result_types
            .iter()
            .find(|choice| choice.label.eq_ignore_ascii_case(label.trim()))
            .map(|choice| ResultType::from_label(&choice.label))
    }

    pub fn result_type_code(&self, result_type: &ResultType) -> Option<&str> {
        self.result_types
            .iter()
            .find(|choice| choice.label == result_type.label())
            .map(|choice| choice.code.as_str())
    }

    pub fn frequency_choice(&self, frequency: Frequency) -> &Choice {
        match frequency {
            Frequency::AsItHappens => &self.frequencies.as_it_happens,
            Frequency::OnceADay => &self.frequencies.once_a_day,
            Frequency::OnceAWeek => &self.frequencies.once_a_week,
        }
    }

    pub fn frequency(&self, label: &str) -> Option<Frequency> {
        Frequency::ALL
            .into_iter()
            .find(|frequency| label_matches(&self.frequency_choice(*frequency).label, label))
    }

    pub fn volume_choice(&self, volume: Volume) -> Option<&Choice> {
        self.volumes.as_ref().map(|table| match volume {
            Volume::OnlyBest => &table.only_best,
            Volume::All => &table.all,
        })
    }

    pub fn volume(&self, label: &str) -> Option<Volume> {
        Volume::ALL.into_iter().find(|volume| {
            self.volume_choice(*volume)
                .is_some_and(|choice| label_matches(&choice.label, label))
        })
    }
}

fn label_matches(expected: &str, found: &str) -> bool {
    expected.eq_ignore_ascii_case(found.trim())
}
