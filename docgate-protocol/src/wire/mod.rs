//! Wire framing and message envelope codec, built on top of the document
//! codec in [`crate::document`].
mod error;
mod frame;
mod message;

pub use error::{FrameError, MessageError};
pub use frame::{write_frame, FrameReader, HEADER_LEN, MAX_FRAME_LEN, MIN_FRAME_LEN};
pub use message::{
    CompressionAlgorithm, Header, LegacyQuery, LegacyReply, Message, ModernMessage, OpCode, Section,
    OP_COMPRESSED, OP_MSG, OP_QUERY, OP_REPLY,
};
