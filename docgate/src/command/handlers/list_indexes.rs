use bytes::Bytes;
use docgate_backend::BackendValue;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::{cursor_reply, encode};
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("listIndexes requires a collection name"))?;

    let batch = index_documents(ctx, collection).await?;
    let ns = format!("{}.{}", ctx.command.database, collection);
    cursor_reply(&ns, &batch)
}

/// Shared with `createIndexes`/`dropIndexes`, which need the before/after
/// index set to report `numIndexesBefore`/`numIndexesAfter`.
pub(super) async fn index_names(ctx: &Context<'_>, collection: &str) -> Result<Vec<String>, CommandError> {
    let stmt = ctx.dialect.list_indexes(collection);
    let result = super::backend::run(ctx, &stmt).await?;
    Ok(result
        .rows
        .iter()
        .map(|row| match row.get(0) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        })
        .collect())
}

async fn index_documents(ctx: &Context<'_>, collection: &str) -> Result<Vec<Bytes>, CommandError> {
    let names = index_names(ctx, collection).await?;
    let mut batch = Vec::with_capacity(names.len());
    for name in names {
        let mut b = DocumentBuilder::new();
        encode!(b.begin_document(None));
        encode!(b.append_str("name", &name));
        encode!(b.end_document());
        batch.push(b.finish().map_err(|e| CommandError::internal(e.to_string()))?);
    }
    Ok(batch)
}
