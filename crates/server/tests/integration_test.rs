use bytes::{Bytes, BytesMut};
use std::io::Cursor;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

use galedb_common::ProtocolError;
use galedb_protocol::Frame;
use galedb_storage::Db;

/// Sobe um servidor numa porta efêmera. O `Db` retornado é o mesmo usado
/// pelo servidor, para inspeção do estado interno.
async fn start_server() -> (SocketAddr, Db) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = Db::new();

    tokio::spawn(galedb_server::run(
        listener,
        db.clone(),
        64,
        std::future::pending(),
    ));

    (addr, db)
}

async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

/// Helper: envia um comando raw (sem ler resposta).
async fn send_raw(stream: &mut TcpStream, args: &[&str]) {
    let mut buf = BytesMut::new();
    Frame::array_from_strs(args).encode(&mut buf);
    stream.write_all(&buf).await.unwrap();
    stream.flush().await.unwrap();
}

/// Helper: lê um frame do stream.
async fn read_frame(stream: &mut TcpStream) -> Frame {
    let mut response_buf = BytesMut::with_capacity(4096);
    loop {
        let n = stream.read_buf(&mut response_buf).await.unwrap();
        assert!(n > 0, "server closed connection unexpectedly");

        let mut cursor = Cursor::new(&response_buf[..]);
        match Frame::decode(&mut cursor) {
            Ok(frame) => return frame,
            Err(ProtocolError::Incomplete) => continue,
            Err(e) => panic!("invalid reply: {e}"),
        }
    }
}

/// Helper: envia um comando e retorna o frame de resposta.
async fn send_command(stream: &mut TcpStream, args: &[&str]) -> Frame {
    send_raw(stream, args).await;
    read_frame(stream).await
}

fn bulks(strs: &[&str]) -> Frame {
    Frame::array_from_strs(strs)
}

#[tokio::test]
async fn test_ping_pong() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["PING"]).await;
    assert_eq!(response, Frame::Simple("PONG".into()));
}

#[tokio::test]
async fn test_echo() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["ECHO", "Hello, GaleDB!"]).await;
    assert_eq!(response, Frame::Simple("Hello, GaleDB!".into()));
}

#[tokio::test]
async fn test_set_get() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["SET", "mykey", "myvalue"]).await;
    assert_eq!(response, Frame::Simple("OK".into()));

    let response = send_command(&mut stream, &["GET", "mykey"]).await;
    assert_eq!(response, Frame::Bulk(Bytes::from("myvalue")));

    let response = send_command(&mut stream, &["GET", "missing"]).await;
    assert_eq!(response, Frame::Null);
}

#[tokio::test]
async fn test_empty_value_is_not_null() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["SET", "empty", ""]).await;
    let response = send_command(&mut stream, &["GET", "empty"]).await;
    assert_eq!(response, Frame::Bulk(Bytes::new()));
}

#[tokio::test]
async fn test_set_with_px_expires_lazily() {
    let (addr, db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["SET", "temp", "val", "PX", "10"]).await;
    assert_eq!(response, Frame::Simple("OK".into()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Ninguém leu ainda: a entrada continua armazenada
    assert_eq!(db.string_count(), 1);

    let response = send_command(&mut stream, &["GET", "temp"]).await;
    assert_eq!(response, Frame::Null);
    assert_eq!(db.string_count(), 0);
}

#[tokio::test]
async fn test_set_px_not_integer() {
    let (addr, db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["SET", "k", "v", "PX", "abc"]).await;
    assert_eq!(response, Frame::Error("PX value must be integer".into()));
    assert_eq!(db.string_count(), 0);
}

#[tokio::test]
async fn test_lpush_order() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["LPUSH", "mylist", "a", "b", "c"]).await;
    assert_eq!(response, Frame::Integer(3));

    let response = send_command(&mut stream, &["LRANGE", "mylist", "0", "-1"]).await;
    assert_eq!(response, bulks(&["c", "b", "a"]));
}

#[tokio::test]
async fn test_rpush_order() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["RPUSH", "mylist", "a", "b", "c"]).await;
    assert_eq!(response, Frame::Integer(3));

    let response = send_command(&mut stream, &["LRANGE", "mylist", "0", "-1"]).await;
    assert_eq!(response, bulks(&["a", "b", "c"]));

    let response = send_command(&mut stream, &["LLEN", "mylist"]).await;
    assert_eq!(response, Frame::Integer(3));
}

#[tokio::test]
async fn test_lpop_with_count() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["LPUSH", "mylist", "a", "b", "c"]).await;

    let response = send_command(&mut stream, &["LPOP", "mylist", "2"]).await;
    assert_eq!(response, bulks(&["c", "b"]));

    let response = send_command(&mut stream, &["LRANGE", "mylist", "0", "-1"]).await;
    assert_eq!(response, bulks(&["a"]));
}

#[tokio::test]
async fn test_list_boundaries() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["RPUSH", "mylist", "a", "b", "c"]).await;

    let response = send_command(&mut stream, &["LRANGE", "mylist", "5", "10"]).await;
    assert_eq!(response, Frame::Array(vec![]));

    let response = send_command(&mut stream, &["LPOP", "emptylist"]).await;
    assert_eq!(response, Frame::Null);

    let response = send_command(&mut stream, &["LLEN", "emptylist"]).await;
    assert_eq!(response, Frame::Integer(0));

    let response = send_command(&mut stream, &["LRANGE", "mylist", "a", "b"]).await;
    assert_eq!(response, Frame::Error("invalid start or end index".into()));
}

#[tokio::test]
async fn test_blpop_woken_by_other_client() {
    let (addr, db) = start_server().await;
    let mut consumer = connect(addr).await;
    let mut producer = connect(addr).await;

    send_raw(&mut consumer, &["BLPOP", "jobs", "0"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(db.blocked_clients("jobs"), 1);

    // O produtor recebe a resposta sem esperar pelo consumidor
    let response = tokio::time::timeout(
        Duration::from_secs(1),
        send_command(&mut producer, &["RPUSH", "jobs", "task1"]),
    )
    .await
    .expect("RPUSH should not block");
    assert_eq!(response, Frame::Integer(1));

    let response = read_frame(&mut consumer).await;
    assert_eq!(response, bulks(&["jobs", "task1"]));
    assert_eq!(db.blocked_clients("jobs"), 0);
    assert_eq!(db.llen("jobs"), 0);
}

#[tokio::test]
async fn test_blpop_fast_path() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["RPUSH", "jobs", "a", "b"]).await;
    let response = send_command(&mut stream, &["BLPOP", "jobs", "1"]).await;
    assert_eq!(response, bulks(&["jobs", "a"]));
}

#[tokio::test]
async fn test_blpop_timeout() {
    let (addr, db) = start_server().await;
    let mut stream = connect(addr).await;

    let started = Instant::now();
    let response = send_command(&mut stream, &["BLPOP", "jobs", "0.2"]).await;
    assert_eq!(response, Frame::Null);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(db.blocked_clients("jobs"), 0);

    // A conexão continua utilizável
    let response = send_command(&mut stream, &["PING"]).await;
    assert_eq!(response, Frame::Simple("PONG".into()));
}

#[tokio::test]
async fn test_blpop_waiters_served_in_order() {
    let (addr, _db) = start_server().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    let mut producer = connect(addr).await;

    send_raw(&mut first, &["BLPOP", "jobs", "5"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    send_raw(&mut second, &["BLPOP", "jobs", "5"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    send_command(&mut producer, &["RPUSH", "jobs", "one"]).await;
    assert_eq!(read_frame(&mut first).await, bulks(&["jobs", "one"]));

    send_command(&mut producer, &["RPUSH", "jobs", "two"]).await;
    assert_eq!(read_frame(&mut second).await, bulks(&["jobs", "two"]));
}

#[tokio::test]
async fn test_blpop_disconnect_unregisters_waiter() {
    let (addr, db) = start_server().await;
    let mut consumer = connect(addr).await;

    send_raw(&mut consumer, &["BLPOP", "jobs", "0"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(db.blocked_clients("jobs"), 1);

    drop(consumer);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(db.blocked_clients("jobs"), 0);

    // O item não é entregue a um cliente morto
    let mut producer = connect(addr).await;
    send_command(&mut producer, &["RPUSH", "jobs", "task1"]).await;
    let response = send_command(&mut producer, &["LLEN", "jobs"]).await;
    assert_eq!(response, Frame::Integer(1));
}

#[tokio::test]
async fn test_blpop_invalid_timeout() {
    let (addr, db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["BLPOP", "jobs", "soon"]).await;
    assert_eq!(response, Frame::Error("timeout must be a number".into()));
    assert_eq!(db.blocked_clients("jobs"), 0);
}

#[tokio::test]
async fn test_blpop_negative_timeout_returns_immediately() {
    let (addr, db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["BLPOP", "jobs", "-1"]).await;
    assert_eq!(response, Frame::Null);
    assert_eq!(db.blocked_clients("jobs"), 0);

    send_command(&mut stream, &["RPUSH", "jobs", "task1"]).await;
    let response = send_command(&mut stream, &["BLPOP", "jobs", "-0.5"]).await;
    assert_eq!(response, bulks(&["jobs", "task1"]));
}

#[tokio::test]
async fn test_lpop_count_needs_exactly_one_extra_arg() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["RPUSH", "list", "a", "b", "c"]).await;
    let response = send_command(&mut stream, &["LPOP", "list", "2", "extra"]).await;
    assert_eq!(response, Frame::bulk("a"));
}

#[tokio::test]
async fn test_unknown_command_leaves_state_untouched() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    send_command(&mut stream, &["SET", "a", "1"]).await;
    send_command(&mut stream, &["RPUSH", "list", "x"]).await;

    let response = send_command(&mut stream, &["FOO", "a", "list"]).await;
    assert_eq!(response, Frame::Error("unknown command 'FOO'".into()));

    let response = send_command(&mut stream, &["GET", "a"]).await;
    assert_eq!(response, Frame::Bulk(Bytes::from("1")));
    let response = send_command(&mut stream, &["LLEN", "list"]).await;
    assert_eq!(response, Frame::Integer(1));
}

#[tokio::test]
async fn test_wrong_arity() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    let response = send_command(&mut stream, &["get"]).await;
    assert_eq!(
        response,
        Frame::Error("wrong number of arguments for 'GET'".into())
    );

    let response = send_command(&mut stream, &["RPUSH", "list"]).await;
    assert_eq!(
        response,
        Frame::Error("wrong number of arguments for 'RPUSH'".into())
    );
}

#[tokio::test]
async fn test_protocol_error_keeps_connection_open() {
    let (addr, _db) = start_server().await;
    let mut stream = connect(addr).await;

    stream.write_all(b"HELLO\r\n").await.unwrap();
    let response = read_frame(&mut stream).await;
    assert_eq!(response, Frame::Error("invalid format".into()));

    stream.write_all(b"*0\r\n").await.unwrap();
    let response = read_frame(&mut stream).await;
    assert_eq!(response, Frame::Error("empty command".into()));

    // Linhas terminadas só com \n também são aceitas
    stream.write_all(b"*1\n$4\nPING\n").await.unwrap();
    let response = read_frame(&mut stream).await;
    assert_eq!(response, Frame::Simple("PONG".into()));
}

#[tokio::test]
async fn test_shutdown_releases_blocked_clients() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = Db::new();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(galedb_server::run(listener, db.clone(), 64, async move {
        let _ = shutdown_rx.await;
    }));

    let mut consumer = connect(addr).await;
    send_raw(&mut consumer, &["BLPOP", "jobs", "0"]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(db.blocked_clients("jobs"), 1);

    shutdown_tx.send(()).unwrap();
    server.await.unwrap();

    // O servidor fecha a conexão sem responder
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(1), consumer.read(&mut buf))
        .await
        .expect("connection should be closed")
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(db.blocked_clients("jobs"), 0);
}
