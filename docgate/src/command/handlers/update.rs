//! `update`: one `UPDATE` per entry in the `updates` array (`{q, u}`
//! pairs). Only `$set`-shaped `u` documents translate (see
//! `sql::Postgres::update`); anything else fails the whole command as
//! `UNSUPPORTED` rather than silently skipping it.
use bytes::Bytes;

use crate::error::CommandError;

use super::reply::update_reply;
use super::util::empty_document;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("update requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let updates = doc
        .get_document("updates")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("update requires an 'updates' array"))?;

    let mut n = 0i32;
    let mut n_modified = 0i32;
    for field in updates.fields() {
        let field = field.map_err(|e| CommandError::internal(e.to_string()))?;
        let entry = field
            .value
            .as_document()
            .ok_or_else(|| CommandError::unsupported("each element of 'updates' must be a document"))?;

        let filter = entry
            .get_document("q")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .unwrap_or_else(empty_document);
        let update_doc = entry
            .get_document("u")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .ok_or_else(|| CommandError::unsupported("update entry is missing 'u'"))?;

        let stmt = ctx
            .dialect
            .update(collection, &filter, &update_doc)
            .map_err(|e| CommandError::unsupported(e.to_string()))?;
        let result = super::backend::run(ctx, &stmt).await?;

        n += result.outcome.rows_affected as i32;
        n_modified += result.outcome.rows_affected as i32;
    }

    update_reply(n, n_modified)
}
