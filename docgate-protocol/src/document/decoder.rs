use super::error::DecodeError;

/// Element type tag, as laid out on the wire.
///
/// `Undefined`, `DbPointer`, `Symbol` and `JavaScriptWithScope` are
/// deprecated: the decoder accepts and skips them, the encoder never emits
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ElementType {
    Double,
    String,
    Document,
    Array,
    Binary,
    Undefined,
    ObjectId,
    Boolean,
    DateTime,
    Null,
    Regex,
    DbPointer,
    JavaScript,
    Symbol,
    JavaScriptWithScope,
    Int32,
    Timestamp,
    Int64,
    Decimal128,
    MinKey,
    MaxKey,
}

impl ElementType {
    pub(crate) fn from_tag(tag: u8) -> Result<Self, DecodeError> {
        Ok(match tag {
            0x01 => Self::Double,
            0x02 => Self::String,
            0x03 => Self::Document,
            0x04 => Self::Array,
            0x05 => Self::Binary,
            0x06 => Self::Undefined,
            0x07 => Self::ObjectId,
            0x08 => Self::Boolean,
            0x09 => Self::DateTime,
            0x0A => Self::Null,
            0x0B => Self::Regex,
            0x0C => Self::DbPointer,
            0x0D => Self::JavaScript,
            0x0E => Self::Symbol,
            0x0F => Self::JavaScriptWithScope,
            0x10 => Self::Int32,
            0x11 => Self::Timestamp,
            0x12 => Self::Int64,
            0x13 => Self::Decimal128,
            0xFF => Self::MinKey,
            0x7F => Self::MaxKey,
            other => return Err(DecodeError::UnknownTag(other)),
        })
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Double => 0x01,
            Self::String => 0x02,
            Self::Document => 0x03,
            Self::Array => 0x04,
            Self::Binary => 0x05,
            Self::Undefined => 0x06,
            Self::ObjectId => 0x07,
            Self::Boolean => 0x08,
            Self::DateTime => 0x09,
            Self::Null => 0x0A,
            Self::Regex => 0x0B,
            Self::DbPointer => 0x0C,
            Self::JavaScript => 0x0D,
            Self::Symbol => 0x0E,
            Self::JavaScriptWithScope => 0x0F,
            Self::Int32 => 0x10,
            Self::Timestamp => 0x11,
            Self::Int64 => 0x12,
            Self::Decimal128 => 0x13,
            Self::MinKey => 0xFF,
            Self::MaxKey => 0x7F,
        }
    }
}

/// A decoded value. Variants that reference the source buffer borrow from
/// it rather than copying, matching projection-on-demand over eager tree
/// deserialization.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RawValue<'a> {
    Double(f64),
    String(&'a str),
    Document(RawDocument<'a>),
    Array(RawDocument<'a>),
    Binary { subtype: u8, bytes: &'a [u8] },
    ObjectId([u8; 12]),
    Boolean(bool),
    DateTime(i64),
    Null,
    Regex { pattern: &'a str, options: &'a str },
    Int32(i32),
    Int64(i64),
    Decimal128([u8; 16]),
    MinKey,
    MaxKey,
    /// A deprecated or otherwise unprojected tag, kept only so round-trip
    /// re-encoding can skip it verbatim; never produced for the types named
    /// in the public [`ElementType`] set above Decimal128.
    Other { tag: u8, bytes: &'a [u8] },
}

impl RawValue<'_> {
    pub fn element_type(&self) -> ElementType {
        match self {
            RawValue::Double(_) => ElementType::Double,
            RawValue::String(_) => ElementType::String,
            RawValue::Document(_) => ElementType::Document,
            RawValue::Array(_) => ElementType::Array,
            RawValue::Binary { .. } => ElementType::Binary,
            RawValue::ObjectId(_) => ElementType::ObjectId,
            RawValue::Boolean(_) => ElementType::Boolean,
            RawValue::DateTime(_) => ElementType::DateTime,
            RawValue::Null => ElementType::Null,
            RawValue::Regex { .. } => ElementType::Regex,
            RawValue::Int32(_) => ElementType::Int32,
            RawValue::Int64(_) => ElementType::Int64,
            RawValue::Decimal128(_) => ElementType::Decimal128,
            RawValue::MinKey => ElementType::MinKey,
            RawValue::MaxKey => ElementType::MaxKey,
            RawValue::Other { tag, .. } => ElementType::from_tag(*tag).unwrap_or(ElementType::Undefined),
        }
    }

    /// Best-effort conversion to an `i64`, accepting `Int32`, `Int64` and
    /// `Double` (truncating), the way command argument parsing needs to
    /// since clients send limits/skips as whichever numeric type is handy.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            RawValue::Int32(v) => Some(v as i64),
            RawValue::Int64(v) => Some(v),
            RawValue::Double(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            RawValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&RawDocument<'_>> {
        match self {
            RawValue::Document(d) | RawValue::Array(d) => Some(d),
            _ => None,
        }
    }
}

/// A single `(name, value)` pair in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
    pub name: &'a str,
    pub value: RawValue<'a>,
}

/// A borrowed, cursor-decoded document. Cheap to construct; does not parse
/// fields until iterated or projected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDocument<'a> {
    /// Byte range spanning the 4-byte length through the trailing sentinel,
    /// inclusive.
    bytes: &'a [u8],
}

impl<'a> RawDocument<'a> {
    /// Validate and wrap `bytes` as a document. `bytes` may be longer than
    /// the document itself; only the declared-length prefix is consumed and
    /// validated against `bytes.len()` as a lower bound (a caller holding a
    /// frame that contains more than one document, e.g. a section-1
    /// sequence, slices the frame itself before calling this).
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 5 {
            return Err(DecodeError::Underflow("document header"));
        }
        let declared = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if declared < 5 || declared as usize > bytes.len() {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        let doc = &bytes[..declared as usize];
        if doc[doc.len() - 1] != 0 {
            return Err(DecodeError::MissingSentinel);
        }
        Ok(Self { bytes: doc })
    }

    /// The exact byte range of this document (length prefix through
    /// sentinel).
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn declared_len(&self) -> usize {
        self.bytes.len()
    }

    /// Iterate fields in encounter order.
    pub fn fields(&self) -> FieldIter<'a> {
        FieldIter {
            rest: &self.bytes[4..self.bytes.len() - 1],
        }
    }

    /// Linear scan for a named field; O(N) by design (see module docs) since
    /// canonical ordering must survive round-trips rather than a rebuilt
    /// map.
    pub fn get(&self, name: &str) -> Option<Result<RawValue<'a>, DecodeError>> {
        for field in self.fields() {
            match field {
                Ok(f) if f.name == name => return Some(Ok(f.value)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&'a str>, DecodeError> {
        match self.get(name) {
            None => Ok(None),
            Some(Ok(v)) => v.as_str().map(Some).ok_or_else(|| DecodeError::WrongType {
                field: name.to_string(),
                found: v.element_type(),
                expected: "string",
            }),
            Some(Err(e)) => Err(e),
        }
    }

    pub fn get_i32(&self, name: &str) -> Result<Option<i32>, DecodeError> {
        match self.get(name) {
            None => Ok(None),
            Some(Ok(v)) => v
                .as_i64()
                .map(|i| Some(i as i32))
                .ok_or_else(|| DecodeError::WrongType {
                    field: name.to_string(),
                    found: v.element_type(),
                    expected: "int32",
                }),
            Some(Err(e)) => Err(e),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, DecodeError> {
        match self.get(name) {
            None => Ok(None),
            Some(Ok(v)) => v.as_bool().map(Some).ok_or_else(|| DecodeError::WrongType {
                field: name.to_string(),
                found: v.element_type(),
                expected: "bool",
            }),
            Some(Err(e)) => Err(e),
        }
    }

    pub fn get_document(&self, name: &str) -> Result<Option<RawDocument<'a>>, DecodeError> {
        match self.get(name) {
            None => Ok(None),
            Some(Ok(v)) => match v {
                RawValue::Document(d) | RawValue::Array(d) => Ok(Some(d)),
                other => Err(DecodeError::WrongType {
                    field: name.to_string(),
                    found: other.element_type(),
                    expected: "document",
                }),
            },
            Some(Err(e)) => Err(e),
        }
    }

    /// The first field, used by the command decoder to find the command
    /// name (and, for collection-bearing commands, the collection value).
    pub fn first_field(&self) -> Option<Result<Field<'a>, DecodeError>> {
        self.fields().next()
    }
}

/// Iterator over a document's fields in encounter order.
pub struct FieldIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<Field<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        Some(self.decode_one())
    }
}

impl<'a> FieldIter<'a> {
    fn decode_one(&mut self) -> Result<Field<'a>, DecodeError> {
        let tag = self.take_u8("type tag")?;
        let name = self.take_cstring("field name")?;
        let value = self.decode_value(tag)?;
        Ok(Field { name, value })
    }

    fn take_u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        let (b, rest) = self.rest.split_first().ok_or(DecodeError::Underflow(what))?;
        self.rest = rest;
        Ok(*b)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.rest.len() < n {
            return Err(DecodeError::Underflow(what));
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn take_cstring(&mut self, what: &'static str) -> Result<&'a str, DecodeError> {
        let end = self
            .rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::Underflow(what))?;
        let (head, tail) = self.rest.split_at(end);
        self.rest = &tail[1..];
        std::str::from_utf8(head).map_err(DecodeError::InvalidFieldName)
    }

    fn take_string(&mut self, what: &'static str) -> Result<&'a str, DecodeError> {
        let len = i32::from_le_bytes(self.take(4, what)?.try_into().unwrap());
        if len < 1 {
            return Err(DecodeError::Underflow(what));
        }
        let bytes = self.take(len as usize, what)?;
        let (body, nul) = bytes.split_at(bytes.len() - 1);
        if nul != [0] {
            return Err(DecodeError::MissingSentinel);
        }
        std::str::from_utf8(body).map_err(DecodeError::InvalidString)
    }

    fn decode_value(&mut self, tag: u8) -> Result<RawValue<'a>, DecodeError> {
        let ty = ElementType::from_tag(tag)?;
        Ok(match ty {
            ElementType::Double => RawValue::Double(f64::from_le_bytes(
                self.take(8, "double")?.try_into().unwrap(),
            )),
            ElementType::String => RawValue::String(self.take_string("string")?),
            ElementType::Document => {
                let len = i32::from_le_bytes(
                    self.rest
                        .get(..4)
                        .ok_or(DecodeError::Underflow("subdocument length"))?
                        .try_into()
                        .unwrap(),
                );
                if len < 5 {
                    return Err(DecodeError::LengthMismatch {
                        declared: len,
                        actual: self.rest.len(),
                    });
                }
                let bytes = self.take(len as usize, "subdocument")?;
                RawValue::Document(RawDocument::new(bytes)?)
            }
            ElementType::Array => {
                let len = i32::from_le_bytes(
                    self.rest
                        .get(..4)
                        .ok_or(DecodeError::Underflow("array length"))?
                        .try_into()
                        .unwrap(),
                );
                if len < 5 {
                    return Err(DecodeError::LengthMismatch {
                        declared: len,
                        actual: self.rest.len(),
                    });
                }
                let bytes = self.take(len as usize, "array")?;
                RawValue::Array(RawDocument::new(bytes)?)
            }
            ElementType::Binary => {
                let len = i32::from_le_bytes(self.take(4, "binary length")?.try_into().unwrap());
                if len < 0 {
                    return Err(DecodeError::Underflow("binary length"));
                }
                let subtype = self.take_u8("binary subtype")?;
                let bytes = self.take(len as usize, "binary payload")?;
                RawValue::Binary { subtype, bytes }
            }
            ElementType::ObjectId => {
                let bytes = self.take(12, "object id")?;
                RawValue::ObjectId(bytes.try_into().unwrap())
            }
            ElementType::Boolean => RawValue::Boolean(self.take_u8("bool")? != 0),
            ElementType::DateTime => {
                RawValue::DateTime(i64::from_le_bytes(self.take(8, "datetime")?.try_into().unwrap()))
            }
            ElementType::Null => RawValue::Null,
            ElementType::Regex => {
                let pattern = self.take_cstring("regex pattern")?;
                let options = self.take_cstring("regex options")?;
                RawValue::Regex { pattern, options }
            }
            ElementType::Int32 => {
                RawValue::Int32(i32::from_le_bytes(self.take(4, "int32")?.try_into().unwrap()))
            }
            ElementType::Int64 => {
                RawValue::Int64(i64::from_le_bytes(self.take(8, "int64")?.try_into().unwrap()))
            }
            ElementType::Decimal128 => {
                let bytes = self.take(16, "decimal128")?;
                RawValue::Decimal128(bytes.try_into().unwrap())
            }
            ElementType::MinKey | ElementType::MaxKey => match ty {
                ElementType::MinKey => RawValue::MinKey,
                _ => RawValue::MaxKey,
            },
            // Deprecated: skip over, keep raw bytes for encoder passthrough.
            ElementType::Undefined => RawValue::Other { tag, bytes: &[] },
            ElementType::DbPointer => {
                let _collection = self.take_string("dbpointer collection")?;
                let bytes = self.take(12, "dbpointer id")?;
                RawValue::Other { tag, bytes }
            }
            ElementType::JavaScript | ElementType::Symbol => {
                let s = self.take_string("javascript/symbol")?;
                RawValue::Other { tag, bytes: s.as_bytes() }
            }
            ElementType::JavaScriptWithScope => {
                let len = i32::from_le_bytes(self.take(4, "code_w_scope length")?.try_into().unwrap());
                if len < 5 {
                    return Err(DecodeError::Underflow("code_w_scope length"));
                }
                let bytes = self.take(len as usize - 4, "code_w_scope body")?;
                RawValue::Other { tag, bytes }
            }
            ElementType::Timestamp => {
                let bytes = self.take(8, "timestamp")?;
                RawValue::Other { tag, bytes }
            }
        })
    }
}
