use bytes::Bytes;
use docgate_backend::BackendValue;
use docgate_protocol::DocumentBuilder;

use crate::error::CommandError;

use super::reply::encode;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let stmt = ctx.dialect.list_databases();
    let result = super::backend::run(ctx, &stmt).await?;

    let mut b = DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.begin_array("databases"));
    for row in &result.rows {
        let name = match row.get(0) {
            BackendValue::Text(s) => s,
            other => format!("{other:?}"),
        };
        encode!(b.begin_document(Some("_")));
        encode!(b.append_str("name", &name));
        encode!(b.end_document());
    }
    encode!(b.end_array());
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    b.finish().map_err(|e| CommandError::internal(e.to_string()))
}
