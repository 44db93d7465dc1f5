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
        .ok_or_else(|| CommandError::unsupported("distinct requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let field = doc
        .get_str("key")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("distinct requires a 'key' field"))?;
    let filter = doc
        .get_document("query")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .unwrap_or_else(empty_document);

    let stmt = ctx
        .dialect
        .distinct(collection, field, &filter)
        .map_err(|e| CommandError::unsupported(e.to_string()))?;
    let result = super::backend::run(ctx, &stmt).await?;

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.begin_array("values"));
    for row in &result.rows {
        match row.get(0) {
            BackendValue::Text(s) => encode!(b.append_str("_", &s)),
            BackendValue::Int64(n) => encode!(b.append_i64("_", n)),
            BackendValue::Int32(n) => encode!(b.append_i32("_", n)),
            BackendValue::Float64(n) => encode!(b.append_double("_", n)),
            BackendValue::Bool(v) => encode!(b.append_bool("_", v)),
            BackendValue::Null => encode!(b.append_null("_")),
        }
    }
    encode!(b.end_array());
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
