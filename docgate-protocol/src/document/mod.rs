//! Binary document codec.
//!
//! A document is a self-delimited byte range: a 4-byte little-endian total
//! length followed by `(type-tag, field-name cstring, value)` triples and a
//! trailing zero sentinel. Arrays reuse the same layout with ASCII decimal
//! field names.
mod decoder;
mod encoder;
mod error;

pub use decoder::{ElementType, Field, RawDocument, RawValue};
pub use encoder::DocumentBuilder;
pub use error::{DecodeError, EncodeError};

/// 12-byte object id, synthesized by the server when a document is stored
/// without one. See [`crate::document::ObjectId::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub [u8; 12]);

impl ObjectId {
    /// Generate a unique-enough id: a millisecond timestamp, a random
    /// per-process salt, and a monotonic counter, matching the three-part
    /// shape (timestamp / machine+process / counter) real object ids use
    /// without trying to be cross-process unique.
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let pid = std::process::id();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[0..5].copy_from_slice(&millis.to_be_bytes()[3..8]);
        bytes[5..9].copy_from_slice(&pid.to_be_bytes());
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        let mut s = String::with_capacity(24);
        for b in self.0 {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
        }
        s
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
