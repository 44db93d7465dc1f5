use bytes::Bytes;
use docgate_backend::BackendValue;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("collStats requires a collection name"))?;

    let stmt = ctx.dialect.coll_stats(collection);
    let result = super::backend::run(ctx, &stmt).await?;

    let (count, size_bytes) = result
        .rows
        .first()
        .map(|row| {
            let count = match row.get(0) {
                BackendValue::Int64(n) => n,
                BackendValue::Int32(n) => n as i64,
                BackendValue::Text(s) => s.parse().unwrap_or(0),
                _ => 0,
            };
            let size = match row.get(1) {
                BackendValue::Int64(n) => n,
                BackendValue::Int32(n) => n as i64,
                BackendValue::Text(s) => s.parse().unwrap_or(0),
                _ => 0,
            };
            (count, size)
        })
        .unwrap_or((0, 0));

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_str("ns", &format!("{}.{}", ctx.command.database, collection)));
    encode!(b.append_i64("count", count));
    encode!(b.append_double("size", size_bytes as f64));
    encode!(b.append_double("storageSize", size_bytes as f64));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
