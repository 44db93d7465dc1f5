//! End-to-end session tests over an in-memory duplex stream (§8's
//! handshake/ping/unknown-command scenarios), mirroring the teacher's
//! env-gated `test_connect` pattern for the one scenario that needs a
//! live backend.
use std::time::Duration;

use bytes::Bytes;
use docgate::session;
use docgate::sql::Postgres;
use docgate_backend::{BackendFactory, BackendOptions};
use docgate_pool::{Pool, PoolConfig};
use docgate_protocol::{DocumentBuilder, FrameReader, Message, RawDocument};

fn request_frame(build: impl FnOnce(&mut DocumentBuilder)) -> Bytes {
    let mut b = DocumentBuilder::new();
    b.begin_document(None).unwrap();
    build(&mut b);
    b.end_document().unwrap();
    let doc = b.finish().unwrap();
    Message::write_modern_reply(1, 0, doc).freeze()
}

fn test_pool() -> Pool<BackendFactory> {
    let factory = BackendFactory { options: BackendOptions::default() };
    Pool::new(factory, PoolConfig { connect_timeout: Duration::from_millis(50), ..PoolConfig::default() })
}

async fn roundtrip(request: Bytes) -> Bytes {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let pool = test_pool();
    tokio::spawn(session::run(server, pool, Postgres));

    let (mut read_half, mut write_half) = tokio::io::split(client);
    tokio::io::AsyncWriteExt::write_all(&mut write_half, &request).await.unwrap();

    let mut reader = FrameReader::new();
    let frame = reader.read_frame(&mut read_half).await.unwrap().expect("server replied");
    let message = Message::parse(&frame).unwrap();
    match message {
        Message::Modern(m) => {
            let doc = m.single_document().unwrap();
            Bytes::copy_from_slice(doc.as_bytes())
        }
        _ => panic!("expected a modern reply"),
    }
}

#[tokio::test]
async fn hello_handshake_succeeds_without_a_backend() {
    let request = request_frame(|b| {
        b.append_i32("hello", 1).unwrap();
        b.append_str("$db", "admin").unwrap();
    });
    let reply_bytes = roundtrip(request).await;
    let reply = RawDocument::new(&reply_bytes).unwrap();
    assert_eq!(reply.get_bool("isWritablePrimary").unwrap(), Some(true));
    assert_eq!(reply.get_bool("helloOk").unwrap(), Some(true));
}

#[tokio::test]
async fn legacy_is_master_reply_carries_ismaster_field() {
    let request = request_frame(|b| {
        b.append_i32("isMaster", 1).unwrap();
        b.append_str("$db", "admin").unwrap();
    });
    let reply_bytes = roundtrip(request).await;
    let reply = RawDocument::new(&reply_bytes).unwrap();
    assert_eq!(reply.get_bool("ismaster").unwrap(), Some(true));
}

#[tokio::test]
async fn ping_succeeds_without_a_backend() {
    let request = request_frame(|b| {
        b.append_i32("ping", 1).unwrap();
        b.append_str("$db", "admin").unwrap();
    });
    let reply_bytes = roundtrip(request).await;
    let reply = RawDocument::new(&reply_bytes).unwrap();
    assert!(reply.get("code").is_none(), "a successful ping carries no error code");
}

#[tokio::test]
async fn unknown_command_replies_with_command_not_found() {
    let request = request_frame(|b| {
        b.append_i32("notACommand", 1).unwrap();
        b.append_str("$db", "admin").unwrap();
    });
    let reply_bytes = roundtrip(request).await;
    let reply = RawDocument::new(&reply_bytes).unwrap();
    assert_eq!(reply.get_i32("code").unwrap(), Some(59));
}

#[tokio::test]
#[ignore = "requires a live Postgres backend; set DOCGATE_TEST_DATABASE_URL to enable"]
async fn find_on_empty_collection_returns_empty_batch() {
    if std::env::var("DOCGATE_TEST_DATABASE_URL").is_err() {
        return;
    }
    let request = request_frame(|b| {
        b.append_str("find", "nonexistent_probe_collection").unwrap();
        b.append_str("$db", "admin").unwrap();
    });
    let reply_bytes = roundtrip(request).await;
    let reply = RawDocument::new(&reply_bytes).unwrap();
    let cursor = reply.get_document("cursor").unwrap().expect("cursor document present");
    let batch = cursor.get_document("firstBatch").unwrap().expect("firstBatch array present");
    assert_eq!(batch.fields().count(), 0);
}
