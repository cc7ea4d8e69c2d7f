//! Integration test: line exchange over loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use peerlink_protocol::{connect, LineListener};

#[tokio::test]
async fn host_and_client_exchange_lines() {
    let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = LineListener::bind(bind).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut tx, mut rx, _remote) = listener.accept().await.unwrap();
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first, "hello");
        tx.send("hi back").await.unwrap();
        // Client hangs up after reading the reply.
        assert_eq!(rx.recv().await.unwrap(), None);
    });

    let (mut tx, mut rx) = connect(addr, Duration::from_secs(5)).await.unwrap();
    tx.send("hello").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().as_deref(), Some("hi back"));
    tx.shutdown().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server task should finish")
        .unwrap();
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    // Bind then drop to get a port nobody listens on.
    let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let addr = LineListener::bind(bind).await.unwrap().local_addr().unwrap();

    let result = connect(addr, Duration::from_secs(2)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn many_lines_arrive_in_order() {
    let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = LineListener::bind(bind).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (_tx, mut rx, _) = listener.accept().await.unwrap();
        let mut got = Vec::new();
        while let Some(line) = rx.recv().await.unwrap() {
            got.push(line);
        }
        got
    });

    let (mut tx, _rx) = connect(addr, Duration::from_secs(5)).await.unwrap();
    for i in 0..100 {
        tx.send(&format!("line {i}")).await.unwrap();
    }
    tx.shutdown().await.unwrap();

    let got = server.await.unwrap();
    let expected: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
    assert_eq!(got, expected);
}
