//! `insert`: one `INSERT` per document in the `documents` array, each
//! storing `_id` (generated if absent) alongside the full document as
//! jsonb. Success is faithful to what the backend actually reports (§9's
//! design note on not faking `ok`/`n`), so a mid-batch failure stops and
//! reports the rows actually committed.
use bytes::Bytes;
use docgate_protocol::ObjectId;

use crate::error::CommandError;
use crate::sql;

use super::reply::write_reply;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("insert requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let documents = doc
        .get_document("documents")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("insert requires a 'documents' array"))?;

    let mut inserted = 0i32;
    for field in documents.fields() {
        let field = field.map_err(|e| CommandError::internal(e.to_string()))?;
        let entry = field
            .value
            .as_document()
            .ok_or_else(|| CommandError::unsupported("each element of 'documents' must be a document"))?;

        let id = entry
            .get_str("_id")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .map(str::to_string)
            .unwrap_or_else(|| ObjectId::generate().to_hex());

        let document_json = sql::document_to_jsonb(entry).map_err(|e| CommandError::unsupported(e.to_string()))?;
        let stmt = ctx.dialect.insert(collection, &id, document_json);

        let result = super::backend::run(ctx, &stmt).await?;
        inserted += result.outcome.rows_affected as i32;
    }

    write_reply(inserted)
}
