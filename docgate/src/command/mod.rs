//! Command decoder (C4) and dispatch table.
pub mod handlers;

use bytes::Bytes;
use docgate_protocol::{DecodeError, RawDocument};

/// One decoded command, still carrying the raw document bytes so handlers
/// can re-project whatever fields they individually need.
pub struct Command {
    pub name: String,
    pub database: String,
    pub collection: Option<String>,
    pub request_id: i32,
    body: Bytes,
}

impl Command {
    /// Re-parse the backing bytes into a borrowed document. Cheap: no
    /// allocation, just a cursor over `body`.
    pub fn document(&self) -> Result<RawDocument<'_>, DecodeError> {
        RawDocument::new(&self.body)
    }
}

/// Distinguishes a genuinely malformed document (transport-integrity
/// failure, closes the socket per §7) from the command-level
/// `NO_COMMAND_FIELD` case (a well-formed document with no non-`$db`
/// field, replied to with `ok=0`).
pub enum DecodeCommandError {
    Malformed(DecodeError),
    NoCommandField,
}

/// Locate the command name (first non-`$db` field), the `$db` value
/// (defaulting to `"admin"`, scanned across all fields regardless of
/// position), and the collection name (the command field's value, when it
/// is itself a string).
pub fn decode(body: Bytes, request_id: i32) -> Result<Command, DecodeCommandError> {
    let doc = RawDocument::new(&body).map_err(DecodeCommandError::Malformed)?;

    let mut database = None;
    let mut command_field: Option<(String, Option<String>)> = None;

    for field in doc.fields() {
        let field = field.map_err(DecodeCommandError::Malformed)?;
        if field.name == "$db" {
            if let Some(s) = field.value.as_str() {
                database = Some(s.to_string());
            }
            continue;
        }
        if command_field.is_none() {
            let collection = field.value.as_str().map(|s| s.to_string());
            command_field = Some((field.name.to_string(), collection));
        }
    }

    let (name, collection) = command_field.ok_or(DecodeCommandError::NoCommandField)?;
    Ok(Command {
        name,
        database: database.unwrap_or_else(|| "admin".to_string()),
        collection,
        request_id,
        body,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use docgate_protocol::DocumentBuilder;

    fn doc(build: impl FnOnce(&mut DocumentBuilder)) -> Bytes {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        build(&mut b);
        b.end_document().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn command_field_is_first_non_db_field() {
        let bytes = doc(|b| {
            b.append_str("$db", "app").unwrap();
            b.append_str("find", "users").unwrap();
        });
        let cmd = decode(bytes, 1).ok().expect("decodes");
        assert_eq!(cmd.name, "find");
        assert_eq!(cmd.database, "app");
        assert_eq!(cmd.collection.as_deref(), Some("users"));
    }

    #[test]
    fn missing_db_defaults_to_admin() {
        let bytes = doc(|b| {
            b.append_i32("ping", 1).unwrap();
        });
        let cmd = decode(bytes, 1).ok().expect("decodes");
        assert_eq!(cmd.database, "admin");
        assert_eq!(cmd.collection, None);
    }

    #[test]
    fn only_db_field_is_no_command_field() {
        let bytes = doc(|b| {
            b.append_str("$db", "admin").unwrap();
        });
        assert!(matches!(decode(bytes, 1), Err(DecodeCommandError::NoCommandField)));
    }
}
