//! `find`: translate `filter`/`limit`/`skip` to a `SELECT _id, document`
//! statement, run it, and re-project each row into a BSON document for the
//! cursor's `firstBatch` (§8 scenarios 3 and 4).
use bytes::Bytes;
use docgate_backend::BackendValue;

use crate::error::CommandError;
use crate::sql;

use super::reply::cursor_reply;
use super::util::empty_document;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("find requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let filter_doc = doc
        .get_document("filter")
        .map_err(|e| CommandError::internal(e.to_string()))?;
    let filter = filter_doc.unwrap_or_else(empty_document);
    let limit = doc.get_i32("limit").map_err(|e| CommandError::internal(e.to_string()))?.map(i64::from);
    let skip = doc.get_i32("skip").map_err(|e| CommandError::internal(e.to_string()))?.map(i64::from);

    let stmt = ctx
        .dialect
        .find(collection, &filter, limit, skip)
        .map_err(|e| CommandError::unsupported(e.to_string()))?;

    let result = super::backend::run(ctx, &stmt).await?;

    let mut batch = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let id = match row.get(0) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        let document_json = match row.get(1) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        let bson = sql::row_to_document(&id, &document_json).map_err(|e| CommandError::internal(e.to_string()))?;
        batch.push(bson);
    }

    let ns = format!("{}.{}", ctx.command.database, collection);
    cursor_reply(&ns, &batch)
}
