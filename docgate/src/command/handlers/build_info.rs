//! `buildInfo`: static, backend-independent. §9 leaves the exact shape
//! implementation-defined beyond `ok`; these fields are the smallest set a
//! MongoDB driver's handshake tends to probe for.
use bytes::Bytes;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::Context;

pub async fn execute(_ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_str("version", env!("CARGO_PKG_VERSION")));
    encode!(b.begin_array("versionArray"));
    encode!(b.append_i32("_", 0));
    encode!(b.append_i32("_", 1));
    encode!(b.append_i32("_", 0));
    encode!(b.append_i32("_", 0));
    encode!(b.end_array());
    encode!(b.append_str("gitVersion", "unknown"));
    encode!(b.append_i32("maxBsonObjectSize", 16 * 1024 * 1024));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
