// End-to-end notifier tests: mock hub → HassClient → Notifier → call_service.
#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use hassnotify_api::{ConnectOptions, HassClient};
use hassnotify_core::{Household, Location, Notifier, NotifierConfig, Person};

const DEADLINE: Duration = Duration::from_secs(5);

type HubSocket = WebSocketStream<TcpStream>;

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(DEADLINE, fut)
        .await
        .expect("timed out waiting")
}

async fn send_json(ws: &mut HubSocket, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

async fn recv_json(ws: &mut HubSocket) -> Value {
    loop {
        match within(ws.next()).await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Bind a hub, connect a client to it and complete the handshake.
async fn connected() -> (HassClient, HubSocket, u64, Notifier) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/api/websocket", listener.local_addr().unwrap())
        .parse()
        .unwrap();
    let options = ConnectOptions::new(url, SecretString::from("T".to_string()))
        .with_retry_delay(Duration::from_millis(100))
        .with_timeout(DEADLINE);
    let client = HassClient::connect(options);

    let (stream, _) = within(listener.accept()).await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    send_json(&mut ws, json!({ "type": "auth_required" })).await;
    assert_eq!(recv_json(&mut ws).await["type"], "auth");
    send_json(&mut ws, json!({ "type": "auth_ok" })).await;
    let sub_id = recv_json(&mut ws).await["id"].as_u64().unwrap();
    send_json(&mut ws, json!({ "id": sub_id, "type": "result", "success": true })).await;
    within(client.wait_ready()).await.unwrap();

    (client, ws, sub_id, Notifier::new(household_config()))
}

fn household_config() -> NotifierConfig {
    let mut household = Household::default();
    household.people.insert(
        "person.alice".into(),
        Person {
            name: "Alice".into(),
            notification_device: Some("alice_phone".into()),
        },
    );
    household.people.insert(
        "person.bob".into(),
        Person {
            name: "Bob".into(),
            notification_device: Some("bob_phone".into()),
        },
    );
    household.locations.insert(
        "home".into(),
        Location {
            name: "Home".into(),
            owner: None,
            owner_name: None,
        },
    );
    NotifierConfig {
        household,
        ..NotifierConfig::default()
    }
}

fn event(id: u64, entity: &str, old: &str, new: &str) -> Value {
    json!({
        "id": id,
        "type": "event",
        "event": {
            "event_type": "state_changed",
            "data": {
                "entity_id": entity,
                "old_state": { "state": old },
                "new_state": { "state": new }
            }
        }
    })
}

/// Strip the command id so frames can be compared structurally.
fn without_id(mut frame: Value) -> Value {
    assert!(frame["id"].as_u64().is_some(), "call_service must carry an id");
    frame.as_object_mut().unwrap().remove("id");
    frame
}

#[tokio::test]
async fn test_location_changes_become_notifications() {
    let (client, mut ws, sub_id, notifier) = connected().await;
    let shutdown = CancellationToken::new();

    let task = {
        let client = client.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { notifier.run(&client, &shutdown).await })
    };
    tokio::task::yield_now().await;

    send_json(&mut ws, event(sub_id, "person.alice", "not_home", "home")).await;
    assert_eq!(
        without_id(recv_json(&mut ws).await),
        json!({
            "type": "call_service",
            "domain": "notify",
            "service": "mobile_app_bob_phone",
            "service_data": {
                "title": "Alice arrived",
                "message": "Alice arrived at Home",
                "data": {
                    "tag": "location-person.alice",
                    "group": "location",
                    "channel": "Location"
                }
            }
        })
    );

    // Untracked entities and unknown zones are silent; the next frame
    // must belong to Bob leaving.
    send_json(&mut ws, event(sub_id, "light.kitchen", "off", "on")).await;
    send_json(&mut ws, event(sub_id, "person.alice", "home", "home")).await;
    send_json(&mut ws, event(sub_id, "person.bob", "home", "not_home")).await;

    let frame = recv_json(&mut ws).await;
    assert_eq!(frame["service"], "mobile_app_alice_phone");
    assert_eq!(frame["service_data"]["message"], "Bob left Home");
    assert_eq!(frame["service_data"]["data"]["tag"], "location-person.bob");

    shutdown.cancel();
    within(task).await.unwrap();
    within(client.close()).await;
}

#[tokio::test]
async fn test_notifier_exits_when_client_closes() {
    let (client, _ws, _sub_id, notifier) = connected().await;

    let task = {
        let client = client.clone();
        tokio::spawn(async move { notifier.run(&client, &CancellationToken::new()).await })
    };
    tokio::task::yield_now().await;

    within(client.close()).await;
    within(task).await.unwrap();
}
