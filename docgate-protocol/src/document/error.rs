//! Document codec errors.

/// Document decode failures. Every variant corresponds to a way the byte
/// range can fail to be a well-formed document; none of them are recoverable
/// short of closing the connection (see `MALFORMED_DOCUMENT` in the gateway's
/// error taxonomy).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("document declares length {declared} but buffer has {actual} bytes")]
    LengthMismatch { declared: i32, actual: usize },

    #[error("document body truncated while reading {0}")]
    Underflow(&'static str),

    #[error("field name is not valid UTF-8")]
    InvalidFieldName(#[source] std::str::Utf8Error),

    #[error("string value is not valid UTF-8")]
    InvalidString(#[source] std::str::Utf8Error),

    #[error("unknown element type tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("missing trailing zero sentinel")]
    MissingSentinel,

    #[error("requested field {0:?} not present")]
    MissingField(String),

    #[error("field {field:?} has type {found:?}, expected {expected}")]
    WrongType {
        field: String,
        found: super::ElementType,
        expected: &'static str,
    },
}

/// Document builder misuse: a caller called an encoder method out of the
/// begin/end sequence it requires.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("malformed build: {0}")]
    MalformedBuild(&'static str),
}
