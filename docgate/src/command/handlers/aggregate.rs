//! `aggregate`: translates a `pipeline` of `$match`/`$limit`/`$skip` stages
//! into the same `find`-shaped `SELECT` as the `find` command. Any other
//! stage (`$group`, `$sort`, `$lookup`, ...) is `Unsupported` — there is no
//! query planner, so aggregation only goes as far as a single filtered,
//! bounded scan.
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
        .ok_or_else(|| CommandError::unsupported("aggregate requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let pipeline = doc
        .get_document("pipeline")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("aggregate requires a 'pipeline' array"))?;

    let mut filter_doc = None;
    let mut limit = None;
    let mut skip = None;

    for field in pipeline.fields() {
        let field = field.map_err(|e| CommandError::internal(e.to_string()))?;
        let stage = field
            .value
            .as_document()
            .ok_or_else(|| CommandError::unsupported("each pipeline stage must be a document"))?;
        let op = stage
            .first_field()
            .ok_or_else(|| CommandError::unsupported("pipeline stage is empty"))?
            .map_err(|e| CommandError::internal(e.to_string()))?;

        match op.name {
            "$match" => {
                if filter_doc.is_some() {
                    return Err(CommandError::unsupported("only a single $match stage is supported"));
                }
                let m = op
                    .value
                    .as_document()
                    .copied()
                    .ok_or_else(|| CommandError::unsupported("$match value must be a document"))?;
                filter_doc = Some(m);
            }
            "$limit" => {
                limit = Some(op.value.as_i64().ok_or_else(|| CommandError::unsupported("$limit value must be numeric"))?);
            }
            "$skip" => {
                skip = Some(op.value.as_i64().ok_or_else(|| CommandError::unsupported("$skip value must be numeric"))?);
            }
            other => return Err(CommandError::unsupported(format!("pipeline stage '{other}' is not supported"))),
        }
    }

    let filter = filter_doc.unwrap_or_else(empty_document);
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
        batch.push(sql::row_to_document(&id, &document_json).map_err(|e| CommandError::internal(e.to_string()))?);
    }

    let ns = format!("{}.{}", ctx.command.database, collection);
    cursor_reply(&ns, &batch)
}
