//! Minimal BSON-document-to-JSON-text rendering, used to hand documents and
//! flat filters to Postgres as jsonb parameters. Not a general BSON-to-JSON
//! mapping (extended types have no canonical JSON shape here); good enough
//! for the scalar/array/sub-document shapes this gateway actually stores.
use docgate_protocol::{RawDocument, RawValue};

use super::Unsupported;

pub fn reject_operators(doc: &RawDocument<'_>) -> Result<(), Unsupported> {
    for field in doc.fields() {
        let field = field.map_err(|e| Unsupported(format!("malformed filter document: {e}")))?;
        if field.name.starts_with('$') {
            return Err(Unsupported(format!("operator '{}' is not supported by the shallow jsonb translation", field.name)));
        }
        if let RawValue::Document(sub) | RawValue::Array(sub) = &field.value {
            reject_operators(sub)?;
        }
    }
    Ok(())
}

pub fn document_to_json(doc: &RawDocument<'_>) -> Result<String, Unsupported> {
    let mut out = String::from("{");
    let mut first = true;
    for field in doc.fields() {
        let field = field.map_err(|e| Unsupported(format!("malformed document: {e}")))?;
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_json_string(field.name));
        out.push(':');
        out.push_str(&value_to_json(&field.value)?);
    }
    out.push('}');
    Ok(out)
}

fn array_to_json(doc: &RawDocument<'_>) -> Result<String, Unsupported> {
    let mut out = String::from("[");
    let mut first = true;
    for field in doc.fields() {
        let field = field.map_err(|e| Unsupported(format!("malformed array: {e}")))?;
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&value_to_json(&field.value)?);
    }
    out.push(']');
    Ok(out)
}

fn value_to_json(value: &RawValue<'_>) -> Result<String, Unsupported> {
    Ok(match value {
        RawValue::Double(d) => format_finite_f64(*d),
        RawValue::String(s) => escape_json_string(s),
        RawValue::Boolean(b) => b.to_string(),
        RawValue::Int32(i) => i.to_string(),
        RawValue::Int64(i) => i.to_string(),
        RawValue::Null => "null".to_string(),
        RawValue::Document(sub) => document_to_json(sub)?,
        RawValue::Array(sub) => array_to_json(sub)?,
        RawValue::ObjectId(bytes) => escape_json_string(&hex(bytes)),
        RawValue::DateTime(millis) => millis.to_string(),
        other => return Err(Unsupported(format!("{:?} has no jsonb representation", other.element_type()))),
    })
}

fn format_finite_f64(v: f64) -> String {
    if v.is_finite() {
        // Postgres jsonb numeric literals don't accept `inf`/`nan`; callers
        // sending those get a clear rejection instead of a backend parse
        // error downstream.
        format!("{v}")
    } else {
        "null".to_string()
    }
}

fn hex(bytes: &[u8; 12]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(24);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use docgate_protocol::DocumentBuilder;

    fn doc(build: impl FnOnce(&mut DocumentBuilder)) -> bytes::Bytes {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        build(&mut b);
        b.end_document().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn flat_scalars_round_trip_to_json() {
        let bytes = doc(|b| {
            b.append_str("name", "alice").unwrap();
            b.append_i32("age", 30).unwrap();
            b.append_bool("active", true).unwrap();
        });
        let rd = RawDocument::new(&bytes).unwrap();
        let json = document_to_json(&rd).unwrap();
        assert_eq!(json, r#"{"name":"alice","age":30,"active":true}"#);
    }

    #[test]
    fn operator_keys_are_rejected() {
        let bytes = doc(|b| {
            b.begin_document("age").unwrap();
            b.append_i32("$gt", 18).unwrap();
            b.end_document().unwrap();
        });
        let rd = RawDocument::new(&bytes).unwrap();
        assert!(reject_operators(&rd).is_err());
    }
}
