//! `dropIndexes`: `index` names either a single index or `"*"`, meaning
//! every index on the collection (the primary key constraint is not
//! reported by `list_indexes` and so is never a candidate for dropping
//! here).
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
        .ok_or_else(|| CommandError::unsupported("dropIndexes requires a collection name"))?;

    let doc = ctx.command.document().map_err(|e| CommandError::internal(e.to_string()))?;
    let index = doc
        .get_str("index")
        .map_err(|e| CommandError::internal(e.to_string()))?
        .ok_or_else(|| CommandError::unsupported("dropIndexes requires an 'index' name"))?;

    let before = index_names(ctx, collection).await?;

    let targets: Vec<String> = if index == "*" {
        before.clone()
    } else {
        vec![index.to_string()]
    };
    for name in &targets {
        let stmt = ctx.dialect.drop_index(name);
        super::backend::run(ctx, &stmt).await?;
    }

    let mut b = docgate_protocol::DocumentBuilder::new();
    encode!(b.begin_document(None));
    encode!(b.append_i32("nIndexesWas", before.len() as i32));
    encode!(b.append_double("ok", 1.0));
    encode!(b.end_document());
    finish(b)
}
