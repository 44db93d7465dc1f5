//! Shared "acquire a handle, run one statement, return it" path used by
//! every handler that touches the backend. Parameters cross into the
//! backend driver as text (see docgate-backend's text-format decision);
//! a statement with no parameters goes through the simple query protocol,
//! one with parameters through the extended one.
use docgate_backend::QueryResult;

use crate::error::CommandError;
use crate::sql::Statement;

use super::Context;

pub async fn run(ctx: &Context<'_>, stmt: &Statement) -> Result<QueryResult, CommandError> {
    let mut handle = ctx.pool.acquire().await.map_err(|_| CommandError::backend_unavailable())?;

    let bound: Vec<String> = stmt.params.iter().map(|p| p.as_text()).collect();
    let bound_refs: Vec<Option<&str>> = bound.iter().map(|s| Some(s.as_str())).collect();

    let result = if bound_refs.is_empty() {
        handle.simple_query(&stmt.text).await
    } else {
        handle.extended_query(&stmt.text, &bound_refs).await
    };

    match result {
        Ok(r) => Ok(r),
        Err(e) => {
            if matches!(e, docgate_backend::QueryError::Io(_) | docgate_backend::QueryError::Protocol(_)) {
                handle.mark_broken();
            }
            Err(CommandError::backend_failed(e.to_string()))
        }
    }
}
