//! Document wire protocol codec.
//!
//! This crate implements the protocol core that sits directly on the client
//! TCP socket: the binary document (BSON-like) codec, the exact-length frame
//! reader, and the two wire message envelope shapes (modern `OP_MSG` and the
//! legacy `OP_REPLY`/`OP_QUERY` pair used only for the handshake).
//!
//! Nothing in this crate knows about commands, SQL, or pooling; it is pure
//! codec, mirroring the split between a Postgres driver's message layer and
//! its connection/pool layers.
pub mod document;
pub mod wire;

pub use document::{DecodeError, DocumentBuilder, EncodeError, ElementType, Field, RawDocument, RawValue};
pub use wire::{
    CompressionAlgorithm, FrameError, FrameReader, Header, LegacyQuery, LegacyReply, Message, MessageError,
    ModernMessage, OpCode, Section,
};
