use bytes::Bytes;
use docgate_backend::BackendValue;

use crate::error::CommandError;

use super::reply::{encode, finish};
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let stmt = ctx.dialect.db_stats();
    let result = super::backend::run(ctx, &stmt).await?;

    let size_bytes = result
        .rows
        .first()
        .map(|row| match row.get(0) {
            BackendValue::Int64(n) => n,
            BackendValue::Int32(n) => n as i64,
            BackendValue::Text(s) => s.parse().unwrap_or(0),
            _ => 0,
        })
        .unwrap_or(0);

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_str("db", &ctx.command.database));
    encode!(b.append_double("storageSize", size_bytes as f64));
    encode!(b.append_double("fsUsedSize", size_bytes as f64));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
