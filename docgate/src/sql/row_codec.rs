//! The inverse of `json::document_to_json`: parse jsonb text read back off
//! the wire (Postgres's text-format rendering of a `document` column) into
//! a BSON document, reattaching the row's `_id`. A minimal recursive-descent
//! JSON parser — the gateway's only consumer of JSON text, so this stays a
//! few dozen lines rather than pulling in a JSON crate for one call site.
use bytes::Bytes;
use docgate_protocol::DocumentBuilder;

use super::Unsupported;

#[derive(Debug, Clone, PartialEq)]
enum JsonValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self { bytes: s.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), String> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{}' at byte {}", b as char, self.pos))
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue, String> {
        self.skip_ws();
        match self.peek().ok_or("unexpected end of json")? {
            b'{' => self.parse_object(),
            b'[' => self.parse_array(),
            b'"' => Ok(JsonValue::Str(self.parse_string()?)),
            b't' => self.parse_literal("true", JsonValue::Bool(true)),
            b'f' => self.parse_literal("false", JsonValue::Bool(false)),
            b'n' => self.parse_literal("null", JsonValue::Null),
            b'-' | b'0'..=b'9' => self.parse_number(),
            other => Err(format!("unexpected byte '{}' at {}", other as char, self.pos)),
        }
    }

    fn parse_literal(&mut self, lit: &str, value: JsonValue) -> Result<JsonValue, String> {
        if self.bytes[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            Ok(value)
        } else {
            Err(format!("expected '{lit}' at byte {}", self.pos))
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let b = *self.bytes.get(self.pos).ok_or("unterminated string")?;
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let esc = *self.bytes.get(self.pos).ok_or("unterminated escape")?;
                    self.pos += 1;
                    match esc {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'b' => out.push('\u{8}'),
                        b'f' => out.push('\u{c}'),
                        b'u' => {
                            let hex = self.bytes.get(self.pos..self.pos + 4).ok_or("truncated \\u escape")?;
                            let code = u32::from_str_radix(std::str::from_utf8(hex).map_err(|e| e.to_string())?, 16)
                                .map_err(|e| e.to_string())?;
                            self.pos += 4;
                            if let Some(c) = char::from_u32(code) {
                                out.push(c);
                            }
                        }
                        other => return Err(format!("invalid escape '\\{}'", other as char)),
                    }
                }
                _ => {
                    // ASCII fast path; multi-byte UTF-8 just copies through.
                    out.push(b as char);
                }
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> Result<JsonValue, String> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' | b'+' | b'-' => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).map_err(|e| e.to_string())?;
        if is_float {
            text.parse::<f64>().map(JsonValue::Float).map_err(|e| e.to_string())
        } else {
            text.parse::<i64>()
                .map(JsonValue::Int)
                .or_else(|_| text.parse::<f64>().map(JsonValue::Float))
                .map_err(|e| e.to_string())
        }
    }

    fn parse_array(&mut self) -> Result<JsonValue, String> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err("expected ',' or ']' in array".to_string()),
            }
        }
        Ok(JsonValue::Array(items))
    }

    fn parse_object(&mut self) -> Result<JsonValue, String> {
        self.expect(b'{')?;
        let mut fields = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(JsonValue::Object(fields));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err("expected ',' or '}' in object".to_string()),
            }
        }
        Ok(JsonValue::Object(fields))
    }
}

fn parse_json(text: &str) -> Result<JsonValue, String> {
    let mut p = Parser::new(text);
    let value = p.parse_value()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return Err("trailing data after json value".to_string());
    }
    Ok(value)
}

fn encode_value(b: &mut DocumentBuilder, name: &str, value: &JsonValue) -> Result<(), docgate_protocol::EncodeError> {
    match value {
        JsonValue::Null => b.append_null(name),
        JsonValue::Bool(v) => b.append_bool(name, *v),
        JsonValue::Int(v) => b.append_i64(name, *v),
        JsonValue::Float(v) => b.append_double(name, *v),
        JsonValue::Str(v) => b.append_str(name, v),
        JsonValue::Array(items) => {
            b.begin_array(name)?;
            for item in items {
                encode_value(b, "_", item)?;
            }
            b.end_array()
        }
        JsonValue::Object(fields) => {
            b.begin_document(Some(name))?;
            for (k, v) in fields {
                encode_value(b, k, v)?;
            }
            b.end_document()
        }
    }
}

/// Build `{ _id: <id>, ...fields from document_json }` as an encoded BSON
/// document, for one result row of `find`/`aggregate`.
pub fn row_to_document(id: &str, document_json: &str) -> Result<Bytes, Unsupported> {
    let value = parse_json(document_json).map_err(Unsupported)?;
    let mut b = DocumentBuilder::new();
    b.begin_document(None).map_err(|e| Unsupported(e.to_string()))?;
    b.append_str("_id", id).map_err(|e| Unsupported(e.to_string()))?;
    if let JsonValue::Object(fields) = value {
        for (k, v) in fields {
            if k == "_id" {
                continue;
            }
            encode_value(&mut b, &k, &v).map_err(|e| Unsupported(e.to_string()))?;
        }
    }
    b.end_document().map_err(|e| Unsupported(e.to_string()))?;
    b.finish().map_err(|e| Unsupported(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_nested_object_with_array() {
        let v = parse_json(r#"{"a":1,"b":[1,2,3],"c":{"d":"x"},"e":null,"f":true}"#).unwrap();
        match v {
            JsonValue::Object(fields) => assert_eq!(fields.len(), 5),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn row_to_document_includes_id_and_fields() {
        let bytes = row_to_document("abc123", r#"{"name":"alice","age":30}"#).unwrap();
        let doc = docgate_protocol::RawDocument::new(&bytes).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), Some("abc123"));
        assert_eq!(doc.get_str("name").unwrap(), Some("alice"));
    }
}
