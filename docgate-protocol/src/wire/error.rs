//! Frame and message codec errors. Every one of these corresponds to a
//! transport-integrity failure: the gateway's session worker closes the
//! connection on any of them rather than attempting a reply (see the
//! error taxonomy in the top-level spec).

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("frame length {0} outside the allowed range 16..=48000000")]
    InvalidLength(i32),
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Document(#[from] crate::document::DecodeError),

    #[error("header declares length {declared} but frame is {actual} bytes")]
    HeaderLengthMismatch { declared: i32, actual: usize },

    #[error("unsupported opcode {0}")]
    UnsupportedOpCode(i32),

    #[error("unsupported section kind {0}")]
    UnsupportedSectionKind(u8),

    #[error("unsupported compression algorithm id {0}")]
    UnsupportedCompression(u8),

    #[error("decompressed payload does not match declared uncompressed size")]
    DecompressionSizeMismatch,

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("checksum mismatch: frame CRC32C does not match trailing checksum")]
    ChecksumMismatch,
}
