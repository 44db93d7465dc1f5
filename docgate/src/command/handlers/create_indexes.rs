//! `createIndexes`: one `CREATE INDEX` per entry in the `indexes` array
//! (`{key: {field: 1}, name, unique}`). Only single-field key documents are
//! supported — a compound key is `Unsupported`, matching the storage
//! model's single `document ->> field` expression index.
use bytes::Bytes;

use crate::error::CommandError;

use super::list_indexes::index_names;
use super::reply::{encode, finish};
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("createIndexes requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let indexes = doc
        .get_document("indexes")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("createIndexes requires an 'indexes' array"))?;

    let before = index_names(ctx, collection).await?.len() as i32;

    for field in indexes.fields() {
        let field = field.map_err(|e| CommandError::internal(e.to_string()))?;
        let entry = field
            .value
            .as_document()
            .ok_or_else(|| CommandError::unsupported("each element of 'indexes' must be a document"))?;

        let key = entry
            .get_document("key")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .ok_or_else(|| CommandError::unsupported("index entry is missing 'key'"))?;
        let key_field = key
            .first_field()
            .ok_or_else(|| CommandError::unsupported("index 'key' must name at least one field"))?
            .map_err(|e| CommandError::internal(e.to_string()))?
            .name
            .to_string();
        if key.fields().count() != 1 {
            return Err(CommandError::unsupported("compound index keys are not supported"));
        }

        let name = entry
            .get_str("name")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .map(str::to_string)
            .unwrap_or_else(|| format!("{collection}_{key_field}"));
        let unique = entry
            .get_bool("unique")
            .map_err(|e| CommandError::internal(e.to_string()))?
            .unwrap_or(false);

        let stmt = ctx.dialect.create_index(collection, &name, &key_field, unique);
        super::backend::run(ctx, &stmt).await?;
    }

    let after = index_names(ctx, collection).await?.len() as i32;

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_i32("numIndexesBefore", before));
    encode!(b.append_i32("numIndexesAfter", after));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
