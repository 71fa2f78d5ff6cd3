use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reportcast::{
    server, BroadcastHub, ClientConfig, ClientState, GroupStatus, HubConfig, ReconnectingClient,
    ReportStore,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

async fn post_raw(addr: SocketAddr, path: &str, body: &str) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.expect("connect server");
    let req = format!(
        "POST {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, serde_json::from_str(body).expect("json body"))
}

fn report(id: &str) -> String {
    json!({
        "minversion": 1,
        "version": 1,
        "id": id,
        "createdAt": "2024-05-01T12:00:00Z",
        "client": "integration",
        "tests": [
            { "name": "net/tls", "status": "failed", "logs": ["handshake timeout"] },
            { "name": "net/dial", "status": "success" },
            { "name": "disk/fsync", "status": "skipped" }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_publish_replay_and_live_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let hub = BroadcastHub::new(HubConfig {
        cache_capacity: 2,
        queue_capacity: 16,
    });
    let shutdown = CancellationToken::new();
    let server_task = tokio::spawn(server::serve_on(listener, hub.clone(), shutdown.clone()));

    for id in ["r1", "r2", "r3"] {
        let (status, body) = post_raw(addr, "/api/publish_report", &report(id)).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "success": true }));
    }
    let (status, body) = post_raw(addr, "/api/publish_report", "not json").await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "bad input" }));

    let store = Arc::new(ReportStore::new());
    let mut changes = store.changes();
    let client = ReconnectingClient::websocket(
        ClientConfig::new(format!("ws://{addr}/api/stream")),
        store.clone(),
    );
    let handle = client.handle();
    let client_task = client.spawn(shutdown.clone());

    // Only the two most recent reports are replayed.
    timeout(WAIT, changes.wait_for(|rev| *rev >= 2))
        .await
        .expect("replay in time")
        .expect("store alive");
    assert_eq!(store.ids(), vec!["r2".to_string(), "r3".to_string()]);
    assert_eq!(handle.state(), ClientState::Connected);

    let (status, _) = post_raw(addr, "/submit", &report("r4")).await;
    assert_eq!(status, 200);
    timeout(WAIT, changes.wait_for(|rev| *rev >= 3))
        .await
        .expect("live report in time")
        .expect("store alive");
    assert_eq!(
        store.ids(),
        vec!["r2".to_string(), "r3".to_string(), "r4".to_string()]
    );

    let r4 = store.get("r4").expect("r4 stored");
    assert_eq!(r4.tests.status, GroupStatus::Failed);
    assert_eq!(r4.tests.num_tests, 3);
    let names: Vec<&str> = r4.tests.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["disk", "net"]);
    assert_eq!(r4.tests.groups[0].status, GroupStatus::Skipped);
    assert_eq!(r4.tests.groups[1].num_failed, 1);
    assert_eq!(r4.extra["client"], "integration");
    assert_eq!(hub.subscriber_count(), 1);

    shutdown.cancel();
    timeout(WAIT, server_task)
        .await
        .expect("server stops")
        .expect("server task")
        .expect("server result");
    timeout(WAIT, client_task)
        .await
        .expect("client stops")
        .expect("client task");
    assert_eq!(handle.state(), ClientState::Disconnected);
}
