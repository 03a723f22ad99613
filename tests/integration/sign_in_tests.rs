//! Sign-in flows against a mock identity endpoint

use crate::fake_service::{
    form_field, html, hidden, local_service, mount_client_login, ACCOUNT, CREDENTIAL, EMAIL,
    SECRET,
};
use galerts::config::{ProtocolConfig, ServiceConfig};
use galerts::{AlertsError, AlertsManager};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_client_login_populates_session() {
    let server = MockServer::start().await;
    mount_client_login(&server).await;

    let mut manager = AlertsManager::new(local_service(&server), ProtocolConfig::classic())
        .expect("Failed to create manager");
    assert!(!manager.is_signed_in());

    manager.sign_in(ACCOUNT, SECRET).await.expect("Sign-in failed");

    let session = manager.session().unwrap();
    assert_eq!(session.email(), EMAIL);
    assert_eq!(session.cookie_header(), CREDENTIAL);
}

#[tokio::test]
async fn test_sign_in_sends_normalized_account_and_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .and(form_field("Email", "someone@example.org"))
        .and(form_field("Passwd", SECRET))
        .and(form_field("service", "alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("SID=1\n"))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::classic()).unwrap();
    manager.sign_in("someone@example.org", SECRET).await.unwrap();
    assert_eq!(manager.email().unwrap(), "someone@example.org");
}

#[tokio::test]
async fn test_rejected_sign_in_is_invalid_credentials() {
    let server = MockServer::start().await;
    mount_client_login(&server).await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::classic()).unwrap();
    let result = manager.sign_in(ACCOUNT, "wrong-secret").await;

    assert!(matches!(result, Err(AlertsError::InvalidCredentials)));
    assert!(!manager.is_signed_in());
}

#[tokio::test]
async fn test_server_error_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("x-debug", "trace-id-1")
                .set_body_string("backend unavailable"),
        )
        .mount(&server)
        .await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::classic()).unwrap();
    let err = manager.sign_in(ACCOUNT, SECRET).await.unwrap_err();

    let response = err.unexpected_response().expect("Expected an unexpected response");
    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(response.body_text(), "backend unavailable");
    assert_eq!(response.headers.get("x-debug").unwrap(), "trace-id-1");
    assert!(response.url.ends_with("/accounts/ClientLogin"));
}

#[tokio::test]
async fn test_empty_login_body_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::classic()).unwrap();
    let result = manager.sign_in(ACCOUNT, SECRET).await;
    assert!(matches!(result, Err(AlertsError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn test_transport_failure_is_transport_error() {
    // Nothing listens on a port whose listener was just closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let service = ServiceConfig::local(&format!("http://{}", address));

    let mut manager = AlertsManager::new(service, ProtocolConfig::classic()).unwrap();
    let result = manager.sign_in(ACCOUNT, SECRET).await;
    assert!(matches!(result, Err(AlertsError::Transport { .. })));
}

async fn mount_seeded_login(server: &MockServer, login_page: &str, expected_seed: &str) {
    Mock::given(method("GET"))
        .and(path("/accounts/ServiceLogin"))
        .and(query_param("service", "alerts"))
        .respond_with(html(login_page))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/accounts/ServiceLoginAuth"))
        .and(form_field("GALX", expected_seed))
        .and(form_field("Passwd", SECRET))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/alerts/manage")
                .insert_header("set-cookie", "SID=seeded; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_seeded_login_round_trips_seed() {
    let server = MockServer::start().await;
    mount_seeded_login(
        &server,
        &format!("<form>{}</form>", hidden("GALX", "seed-value")),
        "seed-value",
    )
    .await;

    // The cookie store carries the session from here on
    Mock::given(method("GET"))
        .and(path("/alerts/manage"))
        .and(header("cookie", "SID=seeded"))
        .respond_with(html("<table></table>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::revised()).unwrap();
    manager.sign_in(ACCOUNT, SECRET).await.unwrap();
    assert_eq!(manager.session().unwrap().cookie_header(), "SID=seeded");

    let listing = manager.list_alerts().await.unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_missing_seed_is_tolerated() {
    let server = MockServer::start().await;
    mount_seeded_login(&server, "<form><input name=\"Email\"></form>", "").await;

    let mut manager =
        AlertsManager::new(local_service(&server), ProtocolConfig::revised()).unwrap();
    manager
        .sign_in(ACCOUNT, SECRET)
        .await
        .expect("Sign-in should proceed without the seed");
}

#[tokio::test]
async fn test_plain_identity_url_is_refused() {
    let server = MockServer::start().await;
    let mut service = local_service(&server);
    service.allow_insecure_sign_in = false;

    let result = AlertsManager::new(service, ProtocolConfig::classic());
    assert!(matches!(result, Err(AlertsError::Config(_))));
}
