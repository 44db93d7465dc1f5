//! Small shared helpers used by several handlers.
use docgate_protocol::RawDocument;

/// A document with zero fields: 4-byte length (5) + sentinel (0).
const EMPTY_DOCUMENT: &[u8] = &[5, 0, 0, 0, 0];

/// The default filter/query when a command omits one.
pub fn empty_document() -> RawDocument<'static> {
    RawDocument::new(EMPTY_DOCUMENT).expect("empty document is valid")
}
