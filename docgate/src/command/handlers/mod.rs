//! Command handlers (C7): one module per command, each a plain async
//! function `execute(ctx) -> Result<Bytes, CommandError>`. Dispatch itself
//! is a flat match in [`dispatch`] rather than a boxed-trait-object
//! registry — the handler set is fixed at compile time, so a match arm is
//! the table the design notes call for without the `dyn Future` ceremony a
//! trait-object version would need.
mod aggregate;
mod backend;
mod build_info;
mod coll_stats;
mod count;
mod create;
mod create_indexes;
mod db_stats;
mod delete;
mod distinct;
mod drop;
mod drop_indexes;
mod explain;
mod find;
mod find_and_modify;
mod hello;
mod insert;
mod list_collections;
mod list_databases;
mod list_indexes;
mod ping;
mod server_status;
mod update;

mod reply;
mod util;

use bytes::Bytes;
use docgate_backend::BackendFactory;
use docgate_pool::Pool;

use crate::command::Command;
use crate::error::CommandError;
use crate::sql::Postgres;

/// Everything a handler needs: the decoded command, the backend pool, and
/// the SQL dialect to translate against. Handlers borrow at most one pool
/// connection and return it on every exit (the pool handle's `Drop`
/// guarantees the return even on an early `?`).
pub struct Context<'a> {
    pub command: &'a Command,
    pub pool: &'a Pool<BackendFactory>,
    pub dialect: &'a Postgres,
}

/// Run the command named in `ctx.command.name` (handshake aliases
/// `hello`/`isMaster`/`ismaster` share one handler), returning the encoded
/// reply document on success or a structured command error on failure.
/// Unknown commands are the one case this function itself resolves, since
/// no handler module exists to own them.
pub async fn dispatch(ctx: &Context<'_>) -> Result<Bytes, CommandError> {
    match ctx.command.name.as_str() {
        "hello" | "isMaster" | "ismaster" => hello::execute(ctx).await,
        "ping" => ping::execute(ctx).await,
        "find" => find::execute(ctx).await,
        "insert" => insert::execute(ctx).await,
        "update" => update::execute(ctx).await,
        "delete" => delete::execute(ctx).await,
        "count" => count::execute(ctx).await,
        "aggregate" => aggregate::execute(ctx).await,
        "listCollections" => list_collections::execute(ctx).await,
        "listIndexes" => list_indexes::execute(ctx).await,
        "createIndexes" => create_indexes::execute(ctx).await,
        "dropIndexes" => drop_indexes::execute(ctx).await,
        "listDatabases" => list_databases::execute(ctx).await,
        "dbStats" => db_stats::execute(ctx).await,
        "collStats" => coll_stats::execute(ctx).await,
        "serverStatus" => server_status::execute(ctx).await,
        "buildInfo" | "buildinfo" => build_info::execute(ctx).await,
        "explain" => explain::execute(ctx).await,
        "findAndModify" => find_and_modify::execute(ctx).await,
        "distinct" => distinct::execute(ctx).await,
        "drop" => drop::execute(ctx).await,
        "create" => create::execute(ctx).await,
        other => Err(CommandError::unknown_command(other)),
    }
}
