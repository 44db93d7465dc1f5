//! `hello`/`isMaster`/`ismaster`: the one handler that must answer without
//! ever touching the backend pool, since clients use it as a readiness
//! probe (§4.7, "Liberal handshake").
use bytes::Bytes;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::Context;

const MAX_BSON_OBJECT_SIZE: i32 = 16_777_216;
const MAX_MESSAGE_SIZE_BYTES: i32 = 48_000_000;
const MAX_WRITE_BATCH_SIZE: i32 = 100_000;
const MIN_WIRE_VERSION: i32 = 0;
const MAX_WIRE_VERSION: i32 = 17;

pub async fn execute(_ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_bool("isWritablePrimary", true));
    // Legacy `isMaster` clients key off this field instead of
    // `isWritablePrimary`; real `hello` replies carry both.
    encode!(b.append_bool("ismaster", true));
    encode!(b.append_bool("helloOk", true));
    encode!(b.append_i32("maxBsonObjectSize", MAX_BSON_OBJECT_SIZE));
    encode!(b.append_i32("maxMessageSizeBytes", MAX_MESSAGE_SIZE_BYTES));
    encode!(b.append_i32("maxWriteBatchSize", MAX_WRITE_BATCH_SIZE));
    encode!(b.append_i32("minWireVersion", MIN_WIRE_VERSION));
    encode!(b.append_i32("maxWireVersion", MAX_WIRE_VERSION));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
