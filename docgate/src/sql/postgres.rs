//! Postgres dialect: identifier quoting, `$n` placeholders, and one
//! `translate_*` function per supported command (§4.6's contract table).
use docgate_protocol::RawDocument;

use super::{filter_to_jsonb, SqlDialect, SqlValue, Statement, TranslateResult, Unsupported};

pub struct Postgres;

impl SqlDialect for Postgres {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }
}

impl Postgres {
    pub fn create_table(&self, collection: &str) -> Statement {
        Statement {
            text: format!(
                "CREATE TABLE IF NOT EXISTS {} (_id text primary key, document jsonb not null)",
                self.quote_ident(collection)
            ),
            params: vec![],
        }
    }

    pub fn drop_table(&self, collection: &str) -> Statement {
        Statement {
            text: format!("DROP TABLE IF EXISTS {}", self.quote_ident(collection)),
            params: vec![],
        }
    }

    pub fn insert(&self, collection: &str, id: &str, document_json: String) -> Statement {
        Statement {
            text: format!(
                "INSERT INTO {} (_id, document) VALUES ($1, $2::jsonb)",
                self.quote_ident(collection)
            ),
            params: vec![SqlValue::Text(id.to_string()), SqlValue::Jsonb(document_json)],
        }
    }

    pub fn find(
        &self,
        collection: &str,
        filter: &RawDocument<'_>,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> TranslateResult {
        let jsonb = filter_to_jsonb(filter)?;
        let mut text = format!("SELECT _id, document FROM {}", self.quote_ident(collection));
        let mut params = Vec::new();
        if let Some(j) = jsonb {
            params.push(SqlValue::Jsonb(j));
            text.push_str(" WHERE document @> $1::jsonb");
        }
        if let Some(n) = skip {
            text.push_str(&format!(" OFFSET {n}"));
        }
        if let Some(n) = limit {
            text.push_str(&format!(" LIMIT {n}"));
        }
        Ok(Statement { text, params })
    }

    pub fn count(&self, collection: &str, filter: &RawDocument<'_>) -> TranslateResult {
        let jsonb = filter_to_jsonb(filter)?;
        let mut text = format!("SELECT COUNT(*) FROM {}", self.quote_ident(collection));
        let mut params = Vec::new();
        if let Some(j) = jsonb {
            params.push(SqlValue::Jsonb(j));
            text.push_str(" WHERE document @> $1::jsonb");
        }
        Ok(Statement { text, params })
    }

    pub fn distinct(&self, collection: &str, field: &str, filter: &RawDocument<'_>) -> TranslateResult {
        let jsonb = filter_to_jsonb(filter)?;
        let mut text = format!(
            "SELECT DISTINCT document ->> $1 AS value FROM {}",
            self.quote_ident(collection)
        );
        let mut params = vec![SqlValue::Text(field.to_string())];
        if let Some(j) = jsonb {
            params.push(SqlValue::Jsonb(j));
            text.push_str(" WHERE document @> $2::jsonb");
        }
        Ok(Statement { text, params })
    }

    pub fn delete(&self, collection: &str, filter: &RawDocument<'_>) -> TranslateResult {
        let jsonb = filter_to_jsonb(filter)?;
        let mut text = format!("DELETE FROM {}", self.quote_ident(collection));
        let mut params = Vec::new();
        if let Some(j) = jsonb {
            params.push(SqlValue::Jsonb(j));
            text.push_str(" WHERE document @> $1::jsonb");
        }
        Ok(Statement { text, params })
    }

    /// Only `$set` updates translate (a jsonb merge); anything else is
    /// `Unsupported` (no query planner, no general update-operator engine).
    pub fn update(&self, collection: &str, filter: &RawDocument<'_>, update_doc: &RawDocument<'_>) -> TranslateResult {
        let set_doc = update_doc
            .get_document("$set")
            .map_err(|e| Unsupported(format!("malformed $set document: {e}")))?
            .ok_or_else(|| Unsupported("only $set-shaped updates are supported".to_string()))?;
        let patch = super::document_to_jsonb(&set_doc)?;
        let jsonb = filter_to_jsonb(filter)?;

        let mut text = format!(
            "UPDATE {} SET document = document || $1::jsonb",
            self.quote_ident(collection)
        );
        let mut params = vec![SqlValue::Jsonb(patch)];
        if let Some(j) = jsonb {
            params.push(SqlValue::Jsonb(j));
            text.push_str(" WHERE document @> $2::jsonb");
        }
        Ok(Statement { text, params })
    }

    pub fn list_collections(&self) -> Statement {
        Statement {
            text: "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name"
                .to_string(),
            params: vec![],
        }
    }

    pub fn list_indexes(&self, collection: &str) -> Statement {
        Statement {
            text: "SELECT indexname FROM pg_indexes WHERE tablename = $1".to_string(),
            params: vec![SqlValue::Text(collection.to_string())],
        }
    }

    /// DDL takes no bind parameters, so `key_field` is escaped as a SQL
    /// string literal (the same way `quote_literal` is already used for
    /// `coll_stats`) rather than concatenated raw.
    pub fn create_index(&self, collection: &str, index_name: &str, key_field: &str, unique: bool) -> Statement {
        let unique_kw = if unique { "UNIQUE " } else { "" };
        Statement {
            text: format!(
                "CREATE {unique_kw}INDEX IF NOT EXISTS {} ON {} ((document ->> {}))",
                self.quote_ident(index_name),
                self.quote_ident(collection),
                quote_literal(key_field)
            ),
            params: vec![],
        }
    }

    pub fn drop_index(&self, index_name: &str) -> Statement {
        Statement {
            text: format!("DROP INDEX IF EXISTS {}", self.quote_ident(index_name)),
            params: vec![],
        }
    }

    pub fn list_databases(&self) -> Statement {
        Statement {
            text: "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname".to_string(),
            params: vec![],
        }
    }

    pub fn db_stats(&self) -> Statement {
        Statement {
            text: "SELECT pg_database_size(current_database()) AS size_bytes".to_string(),
            params: vec![],
        }
    }

    pub fn coll_stats(&self, collection: &str) -> Statement {
        Statement {
            text: format!(
                "SELECT COUNT(*) AS row_count, pg_total_relation_size({}) AS size_bytes FROM {}",
                quote_literal(collection),
                self.quote_ident(collection)
            ),
            params: vec![],
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod test {
    use super::*;
    use docgate_protocol::DocumentBuilder;

    fn empty_filter() -> bytes::Bytes {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.end_document().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn find_with_empty_filter_has_no_where_clause() {
        let bytes = empty_filter();
        let filter = RawDocument::new(&bytes).unwrap();
        let stmt = Postgres.find("users", &filter, None, None).unwrap();
        assert_eq!(stmt.text, "SELECT _id, document FROM \"users\"");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn find_with_limit_and_skip() {
        let bytes = empty_filter();
        let filter = RawDocument::new(&bytes).unwrap();
        let stmt = Postgres.find("users", &filter, Some(10), Some(5)).unwrap();
        assert_eq!(stmt.text, "SELECT _id, document FROM \"users\" OFFSET 5 LIMIT 10");
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(Postgres.quote_ident("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn distinct_binds_field_as_a_parameter() {
        let bytes = empty_filter();
        let filter = RawDocument::new(&bytes).unwrap();
        let stmt = Postgres.distinct("users", "name", &filter).unwrap();
        assert_eq!(stmt.text, "SELECT DISTINCT document ->> $1 AS value FROM \"users\"");
        assert_eq!(stmt.params, vec![SqlValue::Text("name".to_string())]);
    }

    #[test]
    fn distinct_field_with_a_quote_cannot_break_out_of_the_sql_text() {
        let bytes = empty_filter();
        let filter = RawDocument::new(&bytes).unwrap();
        let stmt = Postgres.distinct("users", "a' OR '1'='1", &filter).unwrap();
        assert_eq!(stmt.text, "SELECT DISTINCT document ->> $1 AS value FROM \"users\"");
        assert_eq!(stmt.params, vec![SqlValue::Text("a' OR '1'='1".to_string())]);
    }

    #[test]
    fn create_index_escapes_a_quote_in_the_key_field() {
        let stmt = Postgres.create_index("users", "users_name_idx", "weird'field", false);
        assert_eq!(
            stmt.text,
            "CREATE INDEX IF NOT EXISTS \"users_name_idx\" ON \"users\" ((document ->> 'weird''field'))"
        );
    }
}
