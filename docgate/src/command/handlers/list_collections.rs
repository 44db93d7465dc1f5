use bytes::Bytes;
use docgate_backend::BackendValue;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::{cursor_reply, encode};
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let stmt = ctx.dialect.list_collections();
    let result = super::backend::run(ctx, &stmt).await?;

    let mut batch = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let name = match row.get(0) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        let mut b = DocumentBuilder::new();
        encode!(b.begin_document(None));
        encode!(b.append_str("name", &name));
        encode!(b.append_str("type", "collection"));
        encode!(b.end_document());
        batch.push(b.finish().map_err(|e| CommandError::internal(e.to_string()))?);
    }

    let ns = format!("{}.$cmd.listCollections", ctx.command.database);
    cursor_reply(&ns, &batch)
}
