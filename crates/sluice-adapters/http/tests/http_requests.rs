//! Request/response round trips over a real listener.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use sluice_adapter_http::{HttpAdapter, HttpConfig};
use sluice_core::{Adapter, Message};

const TIMEOUT: Duration = Duration::from_secs(5);

fn local_config() -> HttpConfig {
    let mut config = HttpConfig::new(0);
    config.host = "127.0.0.1".to_string();
    config
}

async fn post(url: String, body: &'static str) -> String {
    reqwest::Client::new()
        .post(url)
        .body(body)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_get_their_own_reply() {
    let adapter = HttpAdapter::bind("http", local_config()).await.unwrap();
    let url = format!("http://{}/", adapter.local_addr());
    let mut conduits = adapter.run_and_attach().await.unwrap();

    let first = tokio::spawn(post(url.clone(), "alpha"));
    let second = tokio::spawn(post(url.clone(), "beta"));

    let mut received: Vec<Message> = Vec::new();
    for _ in 0..2 {
        let message = tokio::time::timeout(TIMEOUT, conduits.inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!message.receiver().is_empty());
        received.push(message);
    }
    assert_ne!(received[0].receiver(), received[1].receiver());

    // A stray reply and the real ones in reverse arrival order.
    conduits
        .outbound
        .send(Message::to("no-such-token", "stray"))
        .await
        .unwrap();
    for message in received.iter().rev() {
        let reply = message.reply(format!("echo:{}", message.body()));
        conduits.outbound.send(reply).await.unwrap();
    }

    let first = tokio::time::timeout(TIMEOUT, first).await.unwrap().unwrap();
    let second = tokio::time::timeout(TIMEOUT, second).await.unwrap().unwrap();
    assert_eq!(first, "echo:alpha\n");
    assert_eq!(second, "echo:beta\n");
    assert_eq!(adapter.pending_requests(), 0);

    tokio::time::timeout(TIMEOUT, adapter.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unanswered_request_times_out_with_empty_body() {
    let mut config = local_config();
    config.reply_timeout = Duration::from_millis(100);
    let adapter = HttpAdapter::bind("http", config).await.unwrap();
    let url = format!("http://{}/", adapter.local_addr());
    let mut conduits = adapter.run_and_attach().await.unwrap();

    let request = tokio::spawn(post(url, "anyone?"));
    let message = tokio::time::timeout(TIMEOUT, conduits.inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.body(), "anyone?");

    let body = tokio::time::timeout(TIMEOUT, request).await.unwrap().unwrap();
    assert_eq!(body, "");
    assert_eq!(adapter.pending_requests(), 0);

    // Too late: the token is gone and the reply is dropped.
    conduits
        .outbound
        .send(message.reply("late"))
        .await
        .unwrap();

    tokio::time::timeout(TIMEOUT, adapter.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disconnected_caller_releases_its_token() {
    // Long enough that only the disconnect can release the tokens.
    let mut config = local_config();
    config.reply_timeout = Duration::from_secs(60);
    let adapter = HttpAdapter::bind("http", config).await.unwrap();
    let addr = adapter.local_addr();
    let mut conduits = adapter.run_and_attach().await.unwrap();

    let mut abandoned = Vec::new();
    for _ in 0..5 {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST / HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 5\r\n\r\nhello"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let message = tokio::time::timeout(TIMEOUT, conduits.inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.body(), "hello");
        drop(stream);
        abandoned.push(message);
    }

    tokio::time::timeout(TIMEOUT, async {
        while adapter.pending_requests() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    // Replies for abandoned requests are dropped.
    for message in &abandoned {
        conduits.outbound.send(message.reply("late")).await.unwrap();
    }
    assert_eq!(adapter.pending_requests(), 0);

    tokio::time::timeout(TIMEOUT, adapter.shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_attach_twice_fails() {
    let adapter = HttpAdapter::bind("http", local_config()).await.unwrap();
    let _conduits = adapter.run_and_attach().await.unwrap();
    assert!(adapter.run_and_attach().await.is_err());
    adapter.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let adapter = HttpAdapter::bind("http", local_config()).await.unwrap();
    let mut taken = local_config();
    taken.port = adapter.local_addr().port();

    assert!(HttpAdapter::bind("http", taken).await.is_err());
}
