use bytes::{BufMut, Bytes, BytesMut};

use super::decoder::RawDocument;
use super::error::EncodeError;
use super::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Document,
    Array,
}

struct Frame {
    /// Offset of the 4-byte length placeholder for this container.
    length_at: usize,
    kind: Kind,
    /// Next auto-generated key for an [`Kind::Array`] frame.
    next_index: usize,
}

/// Builds one document at a time with `begin`/`end` bracketing, in the style
/// of a SAX-like document writer: fields may only be appended while exactly
/// one container is open, and every `begin_*` must be matched by the
/// corresponding `end_*` before [`finish`][DocumentBuilder::finish] can
/// succeed.
///
/// Appending into an array ignores the caller-supplied field name and
/// substitutes the next ASCII-decimal index, since array element names are
/// not meaningful to callers.
pub struct DocumentBuilder {
    buf: BytesMut,
    stack: Vec<Frame>,
    finished: bool,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            stack: Vec::with_capacity(4),
            finished: false,
        }
    }

    fn current(&mut self) -> Result<&mut Frame, EncodeError> {
        self.stack
            .last_mut()
            .ok_or(EncodeError::MalformedBuild("no open document"))
    }

    /// Compute the on-wire field name for the currently open container,
    /// given the name the caller intended for a document field.
    fn field_name(&mut self) -> Result<String, EncodeError> {
        let frame = self.current()?;
        match frame.kind {
            Kind::Document => Err(EncodeError::MalformedBuild(
                "document fields require an explicit name; use append_* with a name",
            )),
            Kind::Array => {
                let idx = frame.next_index;
                frame.next_index += 1;
                Ok(idx.to_string())
            }
        }
    }

    fn write_header(&mut self, tag: u8, name: &str) {
        self.buf.put_u8(tag);
        self.buf.put(name.as_bytes());
        self.buf.put_u8(0);
    }

    /// Begin a new container. `name` is `None` only for the very first call
    /// (the top-level document); every nested `begin_document` must carry
    /// the field name it is stored under.
    /// `name` is required when nesting under a document field and ignored
    /// when nesting under an array element (the array's auto-index is used
    /// instead, same as `append_*`).
    pub fn begin_document(&mut self, name: Option<&str>) -> Result<(), EncodeError> {
        if self.stack.is_empty() {
            if name.is_some() {
                return Err(EncodeError::MalformedBuild("top-level document must not have a field name"));
            }
        } else {
            let key = match self.current()?.kind {
                Kind::Document => name
                    .ok_or(EncodeError::MalformedBuild("nested document requires a field name"))?
                    .to_string(),
                Kind::Array => self.field_name()?,
            };
            self.write_header(0x03, &key);
        }
        let length_at = self.buf.len();
        self.buf.put_i32_le(0); // patched on end_document
        self.stack.push(Frame {
            length_at,
            kind: Kind::Document,
            next_index: 0,
        });
        Ok(())
    }

    /// `name` is used when nesting under a document field and ignored when
    /// nesting under an array element (same rule as [`begin_document`]).
    pub fn begin_array(&mut self, name: &str) -> Result<(), EncodeError> {
        if self.stack.is_empty() {
            return Err(EncodeError::MalformedBuild("array cannot be the top-level value"));
        }
        let key = match self.current()?.kind {
            Kind::Document => name.to_string(),
            Kind::Array => self.field_name()?,
        };
        self.write_header(0x04, &key);
        let length_at = self.buf.len();
        self.buf.put_i32_le(0);
        self.stack.push(Frame {
            length_at,
            kind: Kind::Array,
            next_index: 0,
        });
        Ok(())
    }

    fn end_container(&mut self, expect: Kind, what: &'static str) -> Result<(), EncodeError> {
        let frame = self.stack.pop().ok_or(EncodeError::MalformedBuild(what))?;
        if frame.kind != expect {
            self.stack.push(frame);
            return Err(EncodeError::MalformedBuild(what));
        }
        self.buf.put_u8(0); // sentinel
        let total = (self.buf.len() - frame.length_at) as i32;
        self.buf[frame.length_at..frame.length_at + 4].copy_from_slice(&total.to_le_bytes());
        if self.stack.is_empty() {
            self.finished = true;
        }
        Ok(())
    }

    pub fn end_document(&mut self) -> Result<(), EncodeError> {
        self.end_container(Kind::Document, "end_document without matching begin_document")
    }

    pub fn end_array(&mut self) -> Result<(), EncodeError> {
        self.end_container(Kind::Array, "end_array without matching begin_array")
    }

    fn field_name_or(&mut self, name: &str) -> Result<String, EncodeError> {
        match self.current()?.kind {
            Kind::Document => Ok(name.to_string()),
            Kind::Array => self.field_name(),
        }
    }

    pub fn append_double(&mut self, name: &str, v: f64) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x01, &key);
        self.buf.put_f64_le(v);
        Ok(())
    }

    pub fn append_str(&mut self, name: &str, v: &str) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x02, &key);
        self.buf.put_i32_le(v.len() as i32 + 1);
        self.buf.put(v.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    pub fn append_bool(&mut self, name: &str, v: bool) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x08, &key);
        self.buf.put_u8(v as u8);
        Ok(())
    }

    pub fn append_i32(&mut self, name: &str, v: i32) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x10, &key);
        self.buf.put_i32_le(v);
        Ok(())
    }

    pub fn append_i64(&mut self, name: &str, v: i64) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x12, &key);
        self.buf.put_i64_le(v);
        Ok(())
    }

    pub fn append_datetime(&mut self, name: &str, millis_since_epoch: i64) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x09, &key);
        self.buf.put_i64_le(millis_since_epoch);
        Ok(())
    }

    pub fn append_null(&mut self, name: &str) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x0A, &key);
        Ok(())
    }

    pub fn append_object_id(&mut self, name: &str, id: ObjectId) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x07, &key);
        self.buf.put_slice(&id.0);
        Ok(())
    }

    pub fn append_binary(&mut self, name: &str, subtype: u8, bytes: &[u8]) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x05, &key);
        self.buf.put_i32_le(bytes.len() as i32);
        self.buf.put_u8(subtype);
        self.buf.put_slice(bytes);
        Ok(())
    }

    pub fn append_regex(&mut self, name: &str, pattern: &str, options: &str) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x0B, &key);
        self.buf.put(pattern.as_bytes());
        self.buf.put_u8(0);
        self.buf.put(options.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    pub fn append_decimal128(&mut self, name: &str, bytes: [u8; 16]) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x13, &key);
        self.buf.put_slice(&bytes);
        Ok(())
    }

    pub fn append_min_key(&mut self, name: &str) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0xFF, &key);
        Ok(())
    }

    pub fn append_max_key(&mut self, name: &str) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x7F, &key);
        Ok(())
    }

    /// Embed an already-decoded document's raw bytes as a subdocument field,
    /// used to copy values through untouched (e.g. a filter's sub-objects).
    pub fn append_document(&mut self, name: &str, sub: &RawDocument<'_>) -> Result<(), EncodeError> {
        let key = self.field_name_or(name)?;
        self.write_header(0x03, &key);
        self.buf.put_slice(sub.as_bytes());
        Ok(())
    }

    /// Finalize the document. Fails if any container is still open.
    pub fn finish(self) -> Result<Bytes, EncodeError> {
        if !self.finished || !self.stack.is_empty() {
            return Err(EncodeError::MalformedBuild("finish called with an open container"));
        }
        Ok(self.buf.freeze())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::RawDocument;

    #[test]
    fn round_trip_scalars() {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.append_double("d", 1.5).unwrap();
        b.append_str("s", "hello").unwrap();
        b.append_bool("b", true).unwrap();
        b.append_i32("i32", -7).unwrap();
        b.append_i64("i64", 42).unwrap();
        b.append_null("n").unwrap();
        b.end_document().unwrap();
        let bytes = b.finish().unwrap();

        let doc = RawDocument::new(&bytes).unwrap();
        assert_eq!(doc.get_str("s").unwrap(), Some("hello"));
        assert_eq!(doc.get_bool("b").unwrap(), Some(true));
        assert_eq!(doc.get_i32("i64").unwrap(), Some(42));
        assert_eq!(doc.declared_len(), bytes.len());
    }

    #[test]
    fn nested_array_uses_numeric_keys() {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.begin_array("items").unwrap();
        b.append_i32("ignored", 1).unwrap();
        b.append_i32("ignored", 2).unwrap();
        b.end_array().unwrap();
        b.end_document().unwrap();
        let bytes = b.finish().unwrap();

        let doc = RawDocument::new(&bytes).unwrap();
        let arr = doc.get_document("items").unwrap().unwrap();
        let names: Vec<_> = arr.fields().map(|f| f.unwrap().name.to_string()).collect();
        assert_eq!(names, vec!["0", "1"]);
    }

    #[test]
    fn array_of_documents_uses_numeric_keys() {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.begin_array("items").unwrap();
        b.begin_document(Some("ignored")).unwrap();
        b.append_str("name", "a").unwrap();
        b.end_document().unwrap();
        b.begin_document(Some("ignored")).unwrap();
        b.append_str("name", "b").unwrap();
        b.end_document().unwrap();
        b.end_array().unwrap();
        b.end_document().unwrap();
        let bytes = b.finish().unwrap();

        let doc = RawDocument::new(&bytes).unwrap();
        let arr = doc.get_document("items").unwrap().unwrap();
        let names: Vec<_> = arr.fields().map(|f| f.unwrap().name.to_string()).collect();
        assert_eq!(names, vec!["0", "1"]);
    }

    #[test]
    fn finish_fails_on_unclosed_container() {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.begin_array("a").unwrap();
        assert!(b.finish().is_err());
    }

    #[test]
    fn append_before_begin_is_malformed() {
        let mut b = DocumentBuilder::new();
        assert!(b.append_i32("x", 1).is_err());
    }
}
