mod common;

use std::{sync::Arc, time::Duration};

use axum::http::Method;
use common::{FakeProvider, device, devices};
use spotctl::{
    Error,
    spotify::{
        client::{ApiClient, build_http_client},
        devices::{DeviceResolver, PollPolicy, select_device},
    },
    types::Device,
};
use tokio_util::sync::CancellationToken;

fn test_device(id: &str, name: &str, is_active: bool) -> Device {
    Device {
        id: id.to_string(),
        name: name.to_string(),
        kind: "Computer".to_string(),
        is_active,
        volume_percent: None,
    }
}

fn resolver(provider: &FakeProvider) -> DeviceResolver {
    let settings = provider.settings();
    let http = build_http_client(settings.http_timeout).unwrap();
    DeviceResolver::new(Arc::new(ApiClient::new(http, &settings)))
}

#[test]
fn test_select_device_prefers_active() {
    let list = vec![
        test_device("a", "Kitchen", false),
        test_device("b", "Web Player (Firefox)", false),
        test_device("c", "Laptop", true),
    ];
    assert_eq!(select_device(&list).unwrap().id, "c");
}

#[test]
fn test_select_device_prefers_web_player_over_first() {
    let list = vec![
        test_device("a", "Kitchen", false),
        test_device("b", "Web Player (Chrome)", false),
    ];
    assert_eq!(select_device(&list).unwrap().id, "b");
}

#[test]
fn test_select_device_web_player_is_case_insensitive() {
    let list = vec![
        test_device("a", "Kitchen", false),
        test_device("b", "my WEB PLAYER", false),
    ];
    assert_eq!(select_device(&list).unwrap().id, "b");
}

#[test]
fn test_select_device_falls_back_to_first() {
    let list = vec![
        test_device("a", "Kitchen", false),
        test_device("b", "Phone", false),
    ];
    assert_eq!(select_device(&list).unwrap().id, "a");
}

#[test]
fn test_select_device_first_active_wins() {
    let list = vec![
        test_device("a", "Kitchen", false),
        test_device("b", "Phone", true),
        test_device("c", "Laptop", true),
    ];
    assert_eq!(select_device(&list).unwrap().id, "b");
}

#[test]
fn test_select_device_empty() {
    assert!(select_device(&[]).is_none());
}

#[tokio::test]
async fn test_list_devices_skips_devices_without_id() {
    let provider = FakeProvider::start().await;
    provider.respond(
        Method::GET,
        "/v1/me/player/devices",
        200,
        serde_json::json!({
            "devices": [
                { "id": null, "name": "Restricted", "type": "Speaker", "is_active": true },
                device("d1", "Laptop", false),
            ]
        }),
    );

    let list = resolver(&provider).list_devices("token").await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "d1");
    assert_eq!(list[0].volume_percent, Some(50));

    let request = &provider.requests_to(Method::GET, "/v1/me/player/devices")[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer token"));
}

#[tokio::test]
async fn test_list_devices_empty_is_not_an_error() {
    let provider = FakeProvider::start().await;
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));

    let list = resolver(&provider).list_devices("token").await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_polling_returns_as_soon_as_a_device_appears() {
    let provider = FakeProvider::start().await;
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));
    provider.respond(
        Method::GET,
        "/v1/me/player/devices",
        200,
        devices(vec![device("d1", "Laptop", false)]),
    );

    let policy = PollPolicy {
        max_attempts: 5,
        interval: Duration::from_millis(10),
    };
    let found = resolver(&provider)
        .select_with_polling("token", policy, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(found.unwrap().id, "d1");
    assert_eq!(provider.count(Method::GET, "/v1/me/player/devices"), 3);
}

#[tokio::test]
async fn test_polling_gives_up_after_max_attempts() {
    let provider = FakeProvider::start().await;
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));

    let policy = PollPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(10),
    };
    let found = resolver(&provider)
        .select_with_polling("token", policy, &CancellationToken::new())
        .await
        .unwrap();

    assert!(found.is_none());
    assert_eq!(provider.count(Method::GET, "/v1/me/player/devices"), 3);
}

#[tokio::test]
async fn test_polling_stops_when_cancelled() {
    let provider = FakeProvider::start().await;
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));

    let policy = PollPolicy {
        max_attempts: 100,
        interval: Duration::from_secs(60),
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let found = tokio::time::timeout(
        Duration::from_secs(5),
        resolver(&provider).select_with_polling("token", policy, &cancel),
    )
    .await
    .expect("polling did not observe cancellation")
    .unwrap();

    assert!(found.is_none());
    assert_eq!(provider.count(Method::GET, "/v1/me/player/devices"), 1);
}

#[tokio::test]
async fn test_polling_propagates_auth_failure() {
    let provider = FakeProvider::start().await;
    provider.respond(
        Method::GET,
        "/v1/me/player/devices",
        401,
        serde_json::json!({ "error": { "status": 401, "message": "The access token expired" } }),
    );

    let err = resolver(&provider)
        .select_with_polling("token", PollPolicy::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(provider.count(Method::GET, "/v1/me/player/devices"), 1);
}

#[tokio::test]
async fn test_hung_device_listing_fails_within_timeout() {
    let provider = FakeProvider::start().await;
    provider.respond(Method::GET, "/v1/me/player/devices", 200, devices(vec![]));
    provider.stall(Method::GET, "/v1/me/player/devices", Duration::from_secs(30));
    let mut settings = provider.settings();
    settings.http_timeout = Duration::from_millis(200);
    let http = build_http_client(settings.http_timeout).unwrap();
    let resolver = DeviceResolver::new(Arc::new(ApiClient::new(http, &settings)));

    let err = tokio::time::timeout(Duration::from_secs(5), resolver.list_devices("token"))
        .await
        .expect("device listing was not bounded by the client timeout")
        .unwrap_err();

    assert!(!err.is_auth_failure());
    match err {
        Error::Http(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
}
