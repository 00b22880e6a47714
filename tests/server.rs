//! Drives a real instance of the server over TCP, exercising the RESP wire
//! protocol the way an actual client would.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start_server() -> (std::net::SocketAddr, tempfile::TempDir) {
    let data_dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = data_dir.path().to_path_buf();
    tokio::spawn(async move {
        mapuche::server::run(listener, dir, std::future::pending::<()>())
            .await
            .unwrap();
    });

    (addr, data_dir)
}

fn encode(parts: &[&str]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        buf.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        buf.extend_from_slice(part.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

async fn request(stream: &mut TcpStream, parts: &[&str]) -> String {
    stream.write_all(&encode(parts)).await.unwrap();

    let mut buf = [0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("response timed out")
        .unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[tokio::test]
async fn set_get_and_expire_round_trip() {
    let (addr, _data_dir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    assert_eq!(request(&mut stream, &["SET", "k", "v"]).await, "+OK\r\n");
    assert_eq!(request(&mut stream, &["GET", "k"]).await, "$1\r\nv\r\n");
    assert_eq!(request(&mut stream, &["GET", "missing"]).await, "$-1\r\n");

    assert_eq!(request(&mut stream, &["EXPIRE", "k", "100"]).await, ":1\r\n");
    let ttl = request(&mut stream, &["TTL", "k"]).await;
    assert!(
        ttl.starts_with(':') && !ttl.starts_with(":1844"),
        "unexpected TTL reply: {ttl}"
    );

    assert_eq!(request(&mut stream, &["TTL", "missing"]).await, ":-2\r\n");
}

#[tokio::test]
async fn select_switches_only_this_connections_keyspace() {
    let (addr, _data_dir) = start_server().await;
    let mut a = TcpStream::connect(addr).await.unwrap();
    let mut b = TcpStream::connect(addr).await.unwrap();

    request(&mut a, &["SET", "k", "db0"]).await;
    assert_eq!(request(&mut a, &["SELECT", "1"]).await, "+OK\r\n");
    assert_eq!(request(&mut a, &["GET", "k"]).await, "$-1\r\n");

    assert_eq!(request(&mut b, &["GET", "k"]).await, "$3\r\ndb0\r\n");
}

#[tokio::test]
async fn pipelined_hash_commands_reply_in_order() {
    let (addr, _data_dir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    assert_eq!(
        request(&mut stream, &["HSET", "h", "f1", "v1"]).await,
        ":1\r\n"
    );
    assert_eq!(
        request(&mut stream, &["HSET", "h", "f2", "v2"]).await,
        ":1\r\n"
    );
    assert_eq!(request(&mut stream, &["HLEN", "h"]).await, ":2\r\n");
    assert_eq!(
        request(&mut stream, &["HGET", "h", "f1"]).await,
        "$2\r\nv1\r\n"
    );
}

#[tokio::test]
async fn publish_delivers_to_a_subscribed_connection() {
    let (addr, _data_dir) = start_server().await;
    let mut subscriber = TcpStream::connect(addr).await.unwrap();
    let mut publisher = TcpStream::connect(addr).await.unwrap();

    let sub_reply = request(&mut subscriber, &["SUBSCRIBE", "news"]).await;
    assert!(sub_reply.contains("subscribe"));

    assert_eq!(
        request(&mut publisher, &["PUBLISH", "news", "hello"]).await,
        ":1\r\n"
    );

    let mut buf = [0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(2), subscriber.read(&mut buf))
        .await
        .expect("message never arrived")
        .unwrap();
    let message = String::from_utf8_lossy(&buf[..n]);
    assert!(message.contains("message"));
    assert!(message.contains("hello"));
}

#[tokio::test]
async fn quit_closes_the_connection() {
    let (addr, _data_dir) = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    assert_eq!(request(&mut stream, &["QUIT"]).await, "+OK\r\n");

    let mut buf = [0u8; 16];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "connection should be closed after QUIT");
}
