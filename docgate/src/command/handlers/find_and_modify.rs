//! `findAndModify`: finds the first document matching `query`, applies
//! `update` (`$set`-shaped) or `remove`, and returns the document — the old
//! version by default, or the new one when `new: true`. Modification is
//! re-scoped to `{_id: <found id>}` rather than the original filter, so a
//! filter matching more than one row still only touches the one document
//! reported back.
use bytes::Bytes;
use docgate_backend::BackendValue;
use docgate_protocol::{DocumentBuilder, RawDocument};

use crate::error::CommandError;
use crate::sql;

use super::reply::{encode, finish};
use super::util::empty_document;
use super::Context;

fn id_filter(id: &str) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_str("_id", id));
    encode!(b.end_document());
    finish(b)
}

async fn find_one(
    ctx: &Context<'_>,
    collection: &str,
    filter: &RawDocument<'_>,
) -> Result<Option<(String, String)>, CommandError> {
    let stmt = ctx
        .dialect
        .find(collection, filter, Some(1), None)
        .map_err(|e| CommandError::unsupported(e.to_string()))?;
    let result = super::backend::run(ctx, &stmt).await?;
    Ok(result.rows.first().map(|row| {
        let id = match row.get(0) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        let document_json = match row.get(1) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        (id, document_json)
    }))
}

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("findAndModify requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let query = doc
        .get_document("query")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .unwrap_or_else(empty_document);
    let update_doc = doc.get_document("update").map_err(|e| CommandError::internal(e.to_string()))?;
    let remove = doc.get_bool("remove").map_err(|e| CommandError::internal(e.to_string()))?.unwrap_or(false);
    let want_new = doc.get_bool("new").map_err(|e| CommandError::internal(e.to_string()))?.unwrap_or(false);

    if update_doc.is_none() && !remove {
        return Err(CommandError::unsupported("findAndModify requires either 'update' or 'remove'"));
    }

    let found = find_one(ctx, collection, &query).await?;
    let Some((id, old_json)) = found else {
        return reply_value(None);
    };

    let scoped_bytes = id_filter(&id)?;
    let scoped = RawDocument::new(&scoped_bytes).map_err(|e| CommandError::internal(e.to_string()))?;

    if remove {
        let stmt = ctx.dialect.delete(collection, &scoped).map_err(|e| CommandError::unsupported(e.to_string()))?;
        super::backend::run(ctx, &stmt).await?;
        let old = sql::row_to_document(&id, &old_json).map_err(|e| CommandError::internal(e.to_string()))?;
        return reply_value(Some(old));
    }

    let update_doc = update_doc.expect("checked above");
    let stmt = ctx
        .dialect
        .update(collection, &scoped, &update_doc)
        .map_err(|e| CommandError::unsupported(e.to_string()))?;
    super::backend::run(ctx, &stmt).await?;

    if want_new {
        let refreshed = find_one(ctx, collection, &scoped).await?;
        let (new_id, new_json) = refreshed.ok_or_else(|| CommandError::internal("document vanished after update"))?;
        let new_doc = sql::row_to_document(&new_id, &new_json).map_err(|e| CommandError::internal(e.to_string()))?;
        reply_value(Some(new_doc))
    } else {
        let old = sql::row_to_document(&id, &old_json).map_err(|e| CommandError::internal(e.to_string()))?;
        reply_value(Some(old))
    }
}

fn reply_value(value: Option<Bytes>) -> Result<Bytes, CommandError> {
    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    match value {
        Some(doc) => {
            let raw = RawDocument::new(&doc).map_err(|e| CommandError::internal(e.to_string()))?;
            encode!(b.append_document("value", &raw));
        }
        None => encode!(b.append_null("value")),
    }
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
