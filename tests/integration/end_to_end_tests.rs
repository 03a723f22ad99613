//! Full alert lifecycle against the stateful fake service

use crate::fake_service::{FakeAlerts, ACCOUNT, EMAIL, SECRET};
use galerts::config::{ProtocolConfig, ServiceConfig};
use galerts::{Alert, AlertsError, AlertsManager, DeliveryChoice, Frequency, NewAlert};
use wiremock::MockServer;

async fn signed_in(server: &MockServer) -> AlertsManager {
    let service = ServiceConfig::local(&server.uri());
    let mut manager =
        AlertsManager::new(service, ProtocolConfig::classic()).expect("Failed to create manager");
    manager.sign_in(ACCOUNT, SECRET).await.expect("Sign-in failed");
    manager
}

async fn list(manager: &AlertsManager) -> Vec<Alert> {
    manager
        .list_alerts()
        .await
        .expect("Listing failed")
        .into_alerts()
        .expect("Listing row failed")
}

async fn create(
    manager: &AlertsManager,
    query: &str,
    result_type: &str,
    delivery: DeliveryChoice,
) {
    let request = NewAlert::builder(query, result_type)
        .delivery(delivery)
        .build(manager.protocol())
        .expect("Invalid alert");
    manager.create(&request).await.expect("Create failed");
}

#[tokio::test]
async fn test_alert_lifecycle() {
    let (server, fake) = FakeAlerts::start().await;
    let manager = signed_in(&server).await;
    assert_eq!(manager.email().unwrap(), EMAIL);

    create(&manager, "market volatility", "News", DeliveryChoice::Feed).await;
    assert_eq!(fake.alert_count(), 1);

    let alerts = list(&manager).await;
    assert_eq!(alerts.len(), 1);
    let mut alert = alerts.into_iter().next().unwrap();
    assert_eq!(alert.query(), "market volatility");
    assert_eq!(alert.result_type().label(), "News");
    assert_eq!(alert.delivery().choice(), DeliveryChoice::Feed);
    assert!(alert.feed_url().is_some());
    let handle = alert.handle().to_string();

    alert.set_query("market volatility index").unwrap();
    manager.update(&alert).await.expect("Update failed");

    let alerts = list(&manager).await;
    let updated = alerts
        .iter()
        .find(|listed| listed.handle() == handle)
        .expect("Updated alert missing");
    assert_eq!(updated.query(), "market volatility index");
    assert_eq!(updated.feed_url(), alert.feed_url());

    manager.delete(alert).await.expect("Delete failed");
    assert!(!fake.has_handle(&handle));

    let alerts = list(&manager).await;
    assert!(alerts.iter().all(|listed| listed.handle() != handle));
}

#[tokio::test]
async fn test_unmodified_update_round_trips() {
    let (server, _fake) = FakeAlerts::start().await;
    let manager = signed_in(&server).await;

    create(&manager, "rust language", "Blogs", DeliveryChoice::Email).await;
    create(&manager, "café crème", "Video", DeliveryChoice::Feed).await;

    let before = list(&manager).await;
    assert_eq!(before.len(), 2);
    for alert in &before {
        manager.update(alert).await.expect("Update failed");
    }

    let after = list(&manager).await;
    assert_eq!(before, after);
    assert_eq!(after[1].query(), "café crème");
}

#[tokio::test]
async fn test_switching_delivery_to_email() {
    let (server, fake) = FakeAlerts::start().await;
    let manager = signed_in(&server).await;

    create(&manager, "market volatility", "News", DeliveryChoice::Feed).await;
    let mut alert = list(&manager).await.remove(0);

    alert.set_delivery(DeliveryChoice::Email);
    alert.set_frequency(Frequency::OnceAWeek).unwrap();
    manager.update(&alert).await.unwrap();

    let listed = list(&manager).await.remove(0);
    assert!(listed.delivery().is_email());
    assert_eq!(listed.feed_url(), None);
    assert_eq!(listed.frequency(), Frequency::OnceAWeek);
    assert_eq!(listed, alert);
    assert_eq!(fake.query_of(listed.handle()).as_deref(), Some("market volatility"));
}

#[tokio::test]
async fn test_deleting_twice_is_unexpected_response() {
    let (server, fake) = FakeAlerts::start().await;
    let manager = signed_in(&server).await;

    create(&manager, "market volatility", "News", DeliveryChoice::Feed).await;
    let alert = list(&manager).await.remove(0);
    let stale = alert.clone();

    manager.delete(alert).await.expect("First delete failed");
    assert_eq!(fake.alert_count(), 0);

    let err = manager.delete(stale).await.unwrap_err();
    let response = err.unexpected_response().expect("Expected an unexpected response");
    assert_eq!(response.status.as_u16(), 200);
    assert!(response.body_text().contains("no longer exists"));
}

#[tokio::test]
async fn test_requests_without_session_are_refused() {
    let (server, fake) = FakeAlerts::start().await;
    let mut manager =
        AlertsManager::new(ServiceConfig::local(&server.uri()), ProtocolConfig::classic()).unwrap();

    let result = manager.sign_in(ACCOUNT, "wrong-secret").await;
    assert!(matches!(result, Err(AlertsError::InvalidCredentials)));
    assert!(matches!(
        manager.list_alerts().await,
        Err(AlertsError::NotSignedIn)
    ));
    assert_eq!(fake.alert_count(), 0);
}
