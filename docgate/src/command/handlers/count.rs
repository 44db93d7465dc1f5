use bytes::Bytes;
use docgate_backend::BackendValue;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::util::empty_document;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("count requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let filter = doc
        .get_document("query")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .or(doc.get_document("filter").map_err(|e| CommandError::internal(e.to_string()))?)
        .unwrap_or_else(empty_document);

    let stmt = ctx.dialect.count(collection, &filter).map_err(|e| CommandError::unsupported(e.to_string()))?;
    let result = super::backend::run(ctx, &stmt).await?;

    let n = result
        .rows
        .first()
        .map(|row| match row.get(0) {
            BackendValue::Int64(n) => n,
            BackendValue::Int32(n) => n as i64,
            BackendValue::Text(s) => s.parse().unwrap_or(0),
            _ => 0,
        })
        .unwrap_or(0);

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_i64("n", n));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
