//! `serverStatus`: §9 leaves this implementation-defined ("a minimal
//! document satisfying driver handshakes is enough; no real metrics
//! engine"). This reports the gateway's own identity and uptime-shaped
//! placeholders rather than pretending to proxy Postgres's own stats.
use bytes::Bytes;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::Context;

pub async fn execute(_ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_str("host", "docgate"));
    encode!(b.append_str("version", env!("CARGO_PKG_VERSION")));
    encode!(b.append_str("process", "docgate"));
    encode!(b.begin_document(Some("connections")));
    encode!(b.append_i32("current", 1));
    encode!(b.append_i32("available", 0));
    encode!(b.end_document());
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
