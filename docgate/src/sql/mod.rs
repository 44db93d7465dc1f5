//! SQL translator (C6): maps a command's arguments onto a parameterized
//! statement against a JSON-document storage model (`_id text primary key,
//! document jsonb`, per spec.md's literal `create` row). Dialect text is
//! behind [`SqlDialect`]; only [`Postgres`] is implemented, since the
//! backend driver (C11) is wire-fixed to PostgreSQL, but statement-text
//! generation stays dialect-pluggable so a second one could plug in without
//! touching the framing layer.
mod json;
mod postgres;
mod row_codec;

pub use postgres::Postgres;
pub use row_codec::row_to_document;

use docgate_protocol::RawDocument;

/// A bound value crossing into the backend driver's text-format parameter
/// encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Jsonb(String),
    I64(i64),
}

impl SqlValue {
    pub fn as_text(&self) -> String {
        match self {
            SqlValue::Text(s) => s.clone(),
            SqlValue::Jsonb(s) => s.clone(),
            SqlValue::I64(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub params: Vec<SqlValue>,
}

/// Translation refused this command shape — not every filter/update/
/// aggregation pipeline is expressible through the shallow jsonb-containment
/// translation this gateway implements; see `Non-goals` (no query planner).
#[derive(Debug, Clone)]
pub struct Unsupported(pub String);

impl std::fmt::Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Unsupported {}

pub type TranslateResult = Result<Statement, Unsupported>;

/// Dialect-specific syntax: identifier quoting and parameter placeholders.
/// Statement assembly (C6's contract-level logic) lives in `postgres.rs`
/// today but only calls through this trait for the bits that would change
/// across dialects.
pub trait SqlDialect: Send + Sync {
    fn quote_ident(&self, ident: &str) -> String;
    fn placeholder(&self, index: usize) -> String;
}

/// Flatten a filter document into a jsonb literal for `document @> $n`
/// containment matching, rejecting anything beyond flat scalar equality
/// (operator keys starting with `$`, nested operator documents) as
/// [`Unsupported`] — the translator's explicit "no query planner" line.
pub fn filter_to_jsonb(filter: &RawDocument<'_>) -> Result<Option<String>, Unsupported> {
    if filter.fields().next().is_none() {
        return Ok(None);
    }
    json::reject_operators(filter)?;
    Ok(Some(json::document_to_json(filter)?))
}

/// Serialize a full document (as stored/inserted) to jsonb text.
pub fn document_to_jsonb(doc: &RawDocument<'_>) -> Result<String, Unsupported> {
    json::document_to_json(doc)
}
