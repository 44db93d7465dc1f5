//! `explain`: translates the wrapped command's `{find: ..., filter: ...}`
//! document the same way the real handler would and reports the resulting
//! SQL text, without ever running it against the backend. Only `find` is
//! supported as an explain target — there is no query planner here, so
//! "explain" can only mean "show the SQL", not "show the plan".
use bytes::Bytes;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::util::empty_document;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let inner = doc
        .get_document("explain")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("explain requires an 'explain' document"))?;

    let first = inner
        .first_field()
        .ok_or_else(|| CommandError::unsupported("explain's inner document is empty"))?
        .map_err(|e| CommandError::internal(e.to_string()))?;
    if first.name != "find" {
        return Err(CommandError::unsupported("explain only supports a wrapped 'find' command"));
    }
    let collection = first
        .value
        .as_str()
        .ok_or_else(|| CommandError::unsupported("explain's 'find' value must be a collection name"))?;

    let filter = inner
        .get_document("filter")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .unwrap_or_else(empty_document);
    let limit = inner.get_i32("limit").map_err(|e| CommandError::internal(e.to_string()))?.map(i64::from);
    let skip = inner.get_i32("skip").map_err(|e| CommandError::internal(e.to_string()))?.map(i64::from);

    let stmt = ctx
        .dialect
        .find(collection, &filter, limit, skip)
        .map_err(|e| CommandError::unsupported(e.to_string()))?;

    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.begin_document(Some("queryPlanner")));
    encode!(b.append_str("sql", &stmt.text));
    encode!(b.end_document());
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
