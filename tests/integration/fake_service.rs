//! A stateful fake of the alerts service for end-to-end tests
//!
//! Speaks the classic protocol: ClientLogin sign-in, a management page with
//! `sig` tokens, edit pages with `es`/`hps`, and redirects on success.
//! Tokens are single-use; a reused or unknown token gets an error page.

use galerts::config::{ProtocolConfig, ServiceConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ACCOUNT: &str = "user";
pub const EMAIL: &str = "user@gmail.com";
pub const SECRET: &str = "correct-secret";
pub const CREDENTIAL: &str = "SID=abc; LSID=def; Auth=xyz";
pub const LOGIN_BODY: &str = "SID=abc\nLSID=def\nAuth=xyz\n";

/// Matches a form body carrying a field with an exact value
pub struct FormField(String, String);

impl Match for FormField {
    fn matches(&self, request: &Request) -> bool {
        url::form_urlencoded::parse(&request.body)
            .any(|(name, value)| name == self.0 && value == self.1)
    }
}

pub fn form_field(name: &str, value: &str) -> FormField {
    FormField(name.to_string(), value.to_string())
}

/// Local service configuration pointing at a mock server
pub fn local_service(server: &MockServer) -> ServiceConfig {
    ServiceConfig::local(&server.uri())
}

/// Mounts a ClientLogin endpoint accepting only the test secret
pub async fn mount_client_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .and(body_string_contains(format!("Passwd={}", SECRET)))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_BODY))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Error=BadAuthentication\n"))
        .mount(server)
        .await;
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

pub fn redirect() -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("location", "/alerts/manage?hl=en&gl=us")
}

pub fn hidden(name: &str, value: &str) -> String {
    format!(r#"<input type="hidden" name="{}" value="{}">"#, name, escape(value))
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A classic listing row
pub fn listing_row(
    handle: &str,
    query: &str,
    kind: &str,
    delivery: &str,
    frequency: &str,
) -> String {
    format!(
        concat!(
            r#"<tr class="data_row"><td><input type="checkbox" name="s" value="{}"></td>"#,
            r#"<td><a href="/alerts/edit?s={}">{}</a></td>"#,
            r#"<td><font>{}</font></td><td><font>{}</font></td><td><font>{}</font></td></tr>"#,
        ),
        handle,
        handle,
        escape(query),
        kind,
        delivery,
        frequency
    )
}

/// The placeholder row shown for an address with no alerts
pub fn placeholder_row() -> String {
    r#"<tr class="data_row"><td colspan="5">You have no alerts for other@example.com.</td></tr>"#
        .to_string()
}

#[derive(Debug, Clone)]
enum StoredDelivery {
    Email,
    Feed(String),
}

#[derive(Debug, Clone)]
struct StoredAlert {
    handle: String,
    query: String,
    type_code: String,
    frequency_code: String,
    delivery: StoredDelivery,
}

#[derive(Debug)]
struct State {
    protocol: ProtocolConfig,
    base_url: String,
    alerts: Vec<StoredAlert>,
    /// Outstanding `sig` tokens
    tokens: Vec<String>,
    /// Outstanding `es` tokens and the handle they were issued for
    edit_tokens: HashMap<String, String>,
    counter: usize,
}

impl State {
    fn next(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    fn issue_token(&mut self) -> String {
        let token = format!("sig-{}", self.next());
        self.tokens.push(token.clone());
        token
    }

    fn redeem(&mut self, form: &HashMap<String, String>) -> bool {
        let Some(token) = form.get("sig") else {
            return false;
        };
        match self.tokens.iter().position(|issued| issued == token) {
            Some(index) => {
                self.tokens.remove(index);
                true
            }
            None => false,
        }
    }

    fn type_label(&self, code: &str) -> String {
        self.protocol
            .result_types
            .iter()
            .find(|choice| choice.code == code)
            .map(|choice| choice.label.clone())
            .unwrap_or_else(|| format!("type {}", code))
    }

    fn frequency_label(&self, code: &str) -> String {
        let table = &self.protocol.frequencies;
        [&table.as_it_happens, &table.once_a_day, &table.once_a_week]
            .into_iter()
            .find(|choice| choice.code == code)
            .map(|choice| choice.label.clone())
            .unwrap_or_else(|| format!("frequency {}", code))
    }

    fn feed_url(&mut self) -> String {
        let id = self.next();
        format!("{}/alerts/feeds/1234/{}", self.base_url, id)
    }

    fn render_listing(&mut self) -> String {
        let token = self.issue_token();
        let mut rows = vec![placeholder_row()];
        for alert in &self.alerts {
            let delivery = match &alert.delivery {
                StoredDelivery::Email => "Email".to_string(),
                StoredDelivery::Feed(url) => format!(r#"<a href="{}">feed</a>"#, url),
            };
            rows.push(listing_row(
                &alert.handle,
                &alert.query,
                &self.type_label(&alert.type_code),
                &delivery,
                &self.frequency_label(&alert.frequency_code),
            ));
        }
        format!(
            "<form>{}</form><table>{}</table>",
            hidden("sig", &token),
            rows.join("")
        )
    }
}

fn error_page(message: &str) -> ResponseTemplate {
    html(&format!(r#"<p class="error">{}</p>"#, message))
}

fn form(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

/// Handle to the fake service state
#[derive(Clone)]
pub struct FakeAlerts {
    state: Arc<Mutex<State>>,
}

impl FakeAlerts {
    /// Starts a mock server with sign-in and every alerts endpoint mounted
    pub async fn start() -> (MockServer, FakeAlerts) {
        let server = MockServer::start().await;
        let fake = FakeAlerts {
            state: Arc::new(Mutex::new(State {
                protocol: ProtocolConfig::classic(),
                base_url: server.uri(),
                alerts: Vec::new(),
                tokens: Vec::new(),
                edit_tokens: HashMap::new(),
                counter: 0,
            })),
        };

        mount_client_login(&server).await;

        let routes: [(&str, &str, Box<dyn Respond>); 5] = [
            ("GET", "/alerts", Box::new(CreateFormPage(fake.clone()))),
            ("GET", "/alerts/manage", Box::new(ManagePage(fake.clone()))),
            ("GET", "/alerts/edit", Box::new(EditPage(fake.clone()))),
            ("POST", "/alerts/create", Box::new(CreateAlert(fake.clone()))),
            ("POST", "/alerts/save", Box::new(SaveAlert(fake.clone()))),
        ];
        for (verb, route, responder) in routes {
            Mock::given(method(verb))
                .and(path(route))
                .and(header("cookie", CREDENTIAL))
                .respond_with(BoxedResponder(responder))
                .mount(&server)
                .await;
        }

        (server, fake)
    }

    /// Number of alerts currently stored
    pub fn alert_count(&self) -> usize {
        self.state.lock().unwrap().alerts.len()
    }

    /// Whether an alert with the handle is stored
    pub fn has_handle(&self, handle: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .alerts
            .iter()
            .any(|alert| alert.handle == handle)
    }

    /// Stored query of the alert with the handle
    pub fn query_of(&self, handle: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .alerts
            .iter()
            .find(|alert| alert.handle == handle)
            .map(|alert| alert.query.clone())
    }
}

struct BoxedResponder(Box<dyn Respond>);

impl Respond for BoxedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.0.respond(request)
    }
}

struct CreateFormPage(FakeAlerts);

impl Respond for CreateFormPage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut state = self.0.state.lock().unwrap();
        let token = state.issue_token();
        html(&format!(
            "<form action=\"/alerts/create\">{}<input name=\"q\"></form>",
            hidden("sig", &token)
        ))
    }
}

struct ManagePage(FakeAlerts);

impl Respond for ManagePage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut state = self.0.state.lock().unwrap();
        html(&state.render_listing())
    }
}

struct EditPage(FakeAlerts);

impl Respond for EditPage {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let handle = request
            .url
            .query_pairs()
            .find(|(name, _)| name == "s")
            .map(|(_, value)| value.into_owned());

        let mut state = self.0.state.lock().unwrap();
        let Some(handle) = handle.filter(|handle| state.alerts.iter().any(|a| &a.handle == handle))
        else {
            return ResponseTemplate::new(404);
        };

        let token = state.issue_token();
        let es = format!("es-{}", state.next());
        state.edit_tokens.insert(es.clone(), handle);
        let hps = format!("hps-{}", state.next());

        html(&format!(
            "<form action=\"/alerts/save\">{}{}{}</form>",
            hidden("sig", &token),
            hidden("es", &es),
            hidden("hps", &hps)
        ))
    }
}

struct CreateAlert(FakeAlerts);

impl Respond for CreateAlert {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let form = form(request);
        let mut state = self.0.state.lock().unwrap();
        if !state.redeem(&form) {
            return error_page("Your request could not be verified.");
        }

        let (Some(query), Some(type_code), Some(recipient)) =
            (form.get("q"), form.get("t"), form.get("e"))
        else {
            return error_page("Missing field.");
        };

        let delivery = if recipient == "feed" {
            StoredDelivery::Feed(state.feed_url())
        } else {
            StoredDelivery::Email
        };
        let handle = format!("h{}", state.next());
        state.alerts.push(StoredAlert {
            handle,
            query: query.clone(),
            type_code: type_code.clone(),
            frequency_code: form.get("f").cloned().unwrap_or_else(|| "0".to_string()),
            delivery,
        });
        redirect()
    }
}

struct SaveAlert(FakeAlerts);

impl Respond for SaveAlert {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let form = form(request);
        let mut state = self.0.state.lock().unwrap();
        if !state.redeem(&form) {
            return error_page("Your request could not be verified.");
        }

        if form.get("da").map(String::as_str) == Some("Delete") {
            let handle = form.get("s").cloned().unwrap_or_default();
            let before = state.alerts.len();
            state.alerts.retain(|alert| alert.handle != handle);
            if state.alerts.len() == before {
                return error_page("That alert no longer exists.");
            }
            return redirect();
        }

        let Some(handle) = form.get("es").and_then(|es| state.edit_tokens.remove(es)) else {
            return error_page("Your request could not be verified.");
        };
        if !form.contains_key("hps") {
            return error_page("Your request could not be verified.");
        }

        let existing_feed = state
            .alerts
            .iter()
            .find(|alert| alert.handle == handle)
            .and_then(|alert| match &alert.delivery {
                StoredDelivery::Feed(url) => Some(url.clone()),
                StoredDelivery::Email => None,
            });
        let feed = match (form.get("d").map(String::as_str), existing_feed) {
            (Some("6"), Some(url)) => Some(url),
            (Some("6"), None) => Some(state.feed_url()),
            _ => None,
        };

        let Some(alert) = state.alerts.iter_mut().find(|alert| alert.handle == handle) else {
            return error_page("That alert no longer exists.");
        };
        if let Some(query) = form.get("q") {
            alert.query = query.clone();
        }
        if let Some(type_code) = form.get("t") {
            alert.type_code = type_code.clone();
        }
        match feed {
            Some(url) => {
                alert.delivery = StoredDelivery::Feed(url);
                alert.frequency_code = "0".to_string();
            }
            None => {
                alert.delivery = StoredDelivery::Email;
                if let Some(code) = form.get("f") {
                    alert.frequency_code = code.clone();
                }
            }
        }
        redirect()
    }
}

/// Mounts a static edit page for one handle, expected to be fetched `expected` times
pub async fn mount_edit_page(server: &MockServer, handle: &str, sig: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/alerts/edit"))
        .and(query_param("s", handle))
        .respond_with(html(&format!(
            "<form>{}{}{}</form>",
            hidden("sig", sig),
            hidden("es", &format!("es-{}", handle)),
            hidden("hps", &format!("hps-{}", handle))
        )))
        .expect(expected)
        .mount(server)
        .await;
}
