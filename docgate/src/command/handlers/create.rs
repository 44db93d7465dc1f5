use bytes::Bytes;

use crate::error::CommandError;

use super::reply::simple_ok;
use super::Context;

pub async fn execute(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    let collection = ctx
        .command
        .collection
        .as_deref()
        .ok_or_else(|| CommandError::unsupported("create requires a collection name"))?;

    let stmt = ctx.dialect.create_table(collection);
    super::backend::run(ctx, &stmt).await?;
    simple_ok()
}
