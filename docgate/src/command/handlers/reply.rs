//! Shared reply-document shapes (§4.7's invariant reply shape) and a small
//! helper for mapping the document builder's `EncodeError` (a programmer
//! error — malformed build order) onto a `CommandError::internal`.
use bytes::Bytes;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

pub fn internal_err(e: impl std::fmt::Display) -> CommandError {
    CommandError::internal(e.to_string())
}

/// `$e.map_err(reply::internal_err)?`, spelled once.
macro_rules! encode {
    ($e:expr) => {
        $e.map_err($crate::command::handlers::reply::internal_err)?
    };
}
pub(crate) use encode;

pub fn finish(b: DocumentBuilder) -> Result<Bytes, CommandError> {
    b.finish().map_err(internal_err)
}

/// `{ ok: 1.0 }`, used by handlers with nothing else to report.
pub fn simple_ok() -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}

/// `{ n: <count>, ok: 1.0 }` for write-shaped commands that don't modify
/// existing rows (insert, delete).
pub fn write_reply(n: i32) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_i32("n", n));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}

/// `{ n: <matched>, nModified: <modified>, ok: 1.0 }` for `update`.
pub fn update_reply(n: i32, n_modified: i32) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_i32("n", n));
    encode!(b.append_i32("nModified", n_modified));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}

/// `{ cursor: { id: 0, ns, firstBatch: [...] }, ok: 1.0 }`, shared by
/// `find`, `aggregate`, and `listCollections`/`listIndexes`/`listDatabases`
/// (all of which are cursor-shaped replies per §4.7).
pub fn cursor_reply(ns: &str, batch: &[Bytes]) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.begin_document(Some("cursor")));
    encode!(b.append_i64("id", 0));
    encode!(b.append_str("ns", ns));
    encode!(b.begin_array("firstBatch"));
    for doc in batch {
        let raw = docgate_protocol::RawDocument::new(doc).map_err(internal_err)?;
        encode!(b.append_document("_", &raw));
    }
    encode!(b.end_array());
    encode!(b.end_document());
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
