//! The two wire envelope variants on top of the frame and document codecs:
//! the modern section-based envelope (opCode 2013) and the legacy query /
//! reply pair (opCodes 2004 / 1), plus the compressed envelope that wraps
//! either one.
use bytes::{BufMut, Bytes, BytesMut};

use crate::document::RawDocument;

use super::error::MessageError;

pub const OP_REPLY: i32 = 1;
pub const OP_QUERY: i32 = 2004;
pub const OP_COMPRESSED: i32 = 2012;
pub const OP_MSG: i32 = 2013;

const CHECKSUM_PRESENT: i32 = 0x1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Reply,
    Query,
    Compressed,
    Msg,
}

impl OpCode {
    fn from_i32(v: i32) -> Result<Self, MessageError> {
        Ok(match v {
            OP_REPLY => Self::Reply,
            OP_QUERY => Self::Query,
            OP_COMPRESSED => Self::Compressed,
            OP_MSG => Self::Msg,
            other => return Err(MessageError::UnsupportedOpCode(other)),
        })
    }

    fn to_i32(self) -> i32 {
        match self {
            Self::Reply => OP_REPLY,
            Self::Query => OP_QUERY,
            Self::Compressed => OP_COMPRESSED,
            Self::Msg => OP_MSG,
        }
    }
}

/// The 16-byte frame header common to every opcode.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub message_length: i32,
    pub request_id: i32,
    pub response_to: i32,
    pub op_code: i32,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < 16 {
            return Err(MessageError::HeaderLengthMismatch {
                declared: bytes.len() as i32,
                actual: bytes.len(),
            });
        }
        let i32_at = |off: usize| i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        Ok(Self {
            message_length: i32_at(0),
            request_id: i32_at(4),
            response_to: i32_at(8),
            op_code: i32_at(12),
        })
    }

    fn write(&self, out: &mut BytesMut) {
        out.put_i32_le(self.message_length);
        out.put_i32_le(self.request_id);
        out.put_i32_le(self.response_to);
        out.put_i32_le(self.op_code);
    }
}

/// One section of a modern-envelope body.
#[derive(Debug, Clone)]
pub enum Section {
    /// Kind 0: exactly one document.
    Body(Bytes),
    /// Kind 1: an identifier plus a sequence of documents.
    DocumentSequence { identifier: String, documents: Vec<Bytes> },
}

#[derive(Debug, Clone)]
pub struct ModernMessage {
    pub header: Header,
    pub flags: i32,
    pub sections: Vec<Section>,
    pub checksum: Option<u32>,
}

impl ModernMessage {
    /// The single reply document carried by the first kind-0 section, the
    /// only shape the gateway itself ever emits or needs to read back out
    /// of a client request.
    pub fn single_document(&self) -> Result<RawDocument<'_>, MessageError> {
        for section in &self.sections {
            if let Section::Body(bytes) = section {
                return Ok(RawDocument::new(bytes)?);
            }
        }
        Err(MessageError::UnsupportedSectionKind(0))
    }
}

#[derive(Debug, Clone)]
pub struct LegacyQuery {
    pub header: Header,
    pub flags: i32,
    pub full_collection_name: String,
    pub number_to_skip: i32,
    pub number_to_return: i32,
    pub query: Bytes,
    pub return_fields_selector: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct LegacyReply {
    pub header: Header,
    pub response_flags: i32,
    pub cursor_id: i64,
    pub starting_from: i32,
    pub number_returned: i32,
    pub documents: Vec<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Snappy,
    Zlib,
    Zstd,
}

impl CompressionAlgorithm {
    fn from_id(id: u8) -> Result<Self, MessageError> {
        Ok(match id {
            1 => Self::Snappy,
            2 => Self::Zlib,
            3 => Self::Zstd,
            other => return Err(MessageError::UnsupportedCompression(other)),
        })
    }

    fn id(self) -> u8 {
        match self {
            Self::Snappy => 1,
            Self::Zlib => 2,
            Self::Zstd => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Modern(ModernMessage),
    LegacyQuery(LegacyQuery),
    LegacyReply(LegacyReply),
    Compressed {
        original_op_code: i32,
        uncompressed_size: i32,
        algorithm: CompressionAlgorithm,
        payload: Box<Message>,
    },
}

impl Message {
    pub fn header(&self) -> &Header {
        match self {
            Message::Modern(m) => &m.header,
            Message::LegacyQuery(q) => &q.header,
            Message::LegacyReply(r) => &r.header,
            Message::Compressed { .. } => unreachable!("compressed frames are unwrapped before header access"),
        }
    }

    /// Parse one complete frame (length prefix included) into a typed
    /// message. `Compressed` is recursively unwrapped: the returned value
    /// never itself carries the `Compressed` variant nested more than the
    /// wire actually nested it, but callers generally want the innermost
    /// message, see [`Message::innermost`].
    pub fn parse(frame: &[u8]) -> Result<Self, MessageError> {
        let header = Header::parse(frame)?;
        if header.message_length as usize != frame.len() {
            return Err(MessageError::HeaderLengthMismatch {
                declared: header.message_length,
                actual: frame.len(),
            });
        }
        let body = &frame[16..];
        let op = OpCode::from_i32(header.op_code)?;
        match op {
            OpCode::Msg => Ok(Message::Modern(parse_modern(header, body)?)),
            OpCode::Query => Ok(Message::LegacyQuery(parse_legacy_query(header, body)?)),
            OpCode::Reply => Ok(Message::LegacyReply(parse_legacy_reply(header, body)?)),
            OpCode::Compressed => parse_compressed(header, body),
        }
    }

    /// Unwrap any number of nested `Compressed` layers and return the
    /// concrete envelope underneath.
    pub fn innermost(&self) -> &Message {
        match self {
            Message::Compressed { payload, .. } => payload.innermost(),
            other => other,
        }
    }

    /// Serialize a modern response: one kind-0 section, no checksum.
    pub fn write_modern_reply(request_id_of_reply: i32, response_to: i32, document: Bytes) -> BytesMut {
        let mut body = BytesMut::new();
        body.put_i32_le(0); // flags
        body.put_u8(0); // section kind 0
        body.extend_from_slice(&document);

        let header = Header {
            message_length: 16 + body.len() as i32,
            request_id: request_id_of_reply,
            response_to,
            op_code: OP_MSG,
        };
        let mut out = BytesMut::with_capacity(header.message_length as usize);
        header.write(&mut out);
        out.extend_from_slice(&body);
        out
    }

    /// Serialize a legacy reply: single document, `cursorId = 0`,
    /// `startingFrom = 0`, `numberReturned = 1`.
    pub fn write_legacy_reply(request_id_of_reply: i32, response_to: i32, document: Bytes) -> BytesMut {
        let mut body = BytesMut::new();
        body.put_i32_le(0); // responseFlags
        body.put_i64_le(0); // cursorId
        body.put_i32_le(0); // startingFrom
        body.put_i32_le(1); // numberReturned
        body.extend_from_slice(&document);

        let header = Header {
            message_length: 16 + body.len() as i32,
            request_id: request_id_of_reply,
            response_to,
            op_code: OP_REPLY,
        };
        let mut out = BytesMut::with_capacity(header.message_length as usize);
        header.write(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

fn parse_modern(header: Header, body: &[u8]) -> Result<ModernMessage, MessageError> {
    if body.len() < 4 {
        return Err(MessageError::HeaderLengthMismatch {
            declared: header.message_length,
            actual: body.len() + 16,
        });
    }
    let flags = i32::from_le_bytes(body[0..4].try_into().unwrap());
    let has_checksum = flags & CHECKSUM_PRESENT != 0;

    let (section_bytes, trailing_checksum) = if has_checksum {
        if body.len() < 8 {
            return Err(MessageError::HeaderLengthMismatch {
                declared: header.message_length,
                actual: body.len() + 16,
            });
        }
        let split = body.len() - 4;
        let checksum = u32::from_le_bytes(body[split..].try_into().unwrap());
        (&body[4..split], Some(checksum))
    } else {
        (&body[4..], None)
    };

    if let Some(expected) = trailing_checksum {
        let frame_without_checksum_len = 16 + 4 + section_bytes.len();
        let mut to_check = Vec::with_capacity(frame_without_checksum_len);
        let mut header_buf = BytesMut::new();
        header.write(&mut header_buf);
        to_check.extend_from_slice(&header_buf);
        to_check.extend_from_slice(&flags.to_le_bytes());
        to_check.extend_from_slice(section_bytes);
        let actual = crc32c::crc32c(&to_check);
        if actual != expected {
            return Err(MessageError::ChecksumMismatch);
        }
    }

    let sections = parse_sections(section_bytes)?;
    Ok(ModernMessage {
        header,
        flags,
        sections,
        checksum: trailing_checksum,
    })
}

fn parse_sections(mut rest: &[u8]) -> Result<Vec<Section>, MessageError> {
    let mut sections = Vec::new();
    while !rest.is_empty() {
        let (kind, tail) = rest.split_first().ok_or(MessageError::UnsupportedSectionKind(0))?;
        rest = tail;
        match kind {
            0 => {
                let doc = RawDocument::new(rest)?;
                let len = doc.declared_len();
                sections.push(Section::Body(Bytes::copy_from_slice(&rest[..len])));
                rest = &rest[len..];
            }
            1 => {
                if rest.len() < 4 {
                    return Err(MessageError::Frame(super::error::FrameError::Io(
                        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "section size"),
                    )));
                }
                let size = i32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
                if size < 4 || size > rest.len() {
                    return Err(MessageError::Frame(super::error::FrameError::InvalidLength(size as i32)));
                }
                let section_slice = &rest[4..size];
                let id_end = section_slice
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(MessageError::UnsupportedSectionKind(1))?;
                let identifier = std::str::from_utf8(&section_slice[..id_end])
                    .map_err(|_| MessageError::UnsupportedSectionKind(1))?
                    .to_string();
                let mut doc_bytes = &section_slice[id_end + 1..];
                let mut documents = Vec::new();
                while !doc_bytes.is_empty() {
                    let doc = RawDocument::new(doc_bytes)?;
                    let len = doc.declared_len();
                    documents.push(Bytes::copy_from_slice(&doc_bytes[..len]));
                    doc_bytes = &doc_bytes[len..];
                }
                sections.push(Section::DocumentSequence { identifier, documents });
                rest = &rest[size..];
            }
            other => return Err(MessageError::UnsupportedSectionKind(*other)),
        }
    }
    Ok(sections)
}

fn parse_legacy_query(header: Header, body: &[u8]) -> Result<LegacyQuery, MessageError> {
    let mut rest = body;
    let flags = i32::from_le_bytes(take4(&mut rest)?);
    let full_collection_name = take_cstring(&mut rest)?;
    let number_to_skip = i32::from_le_bytes(take4(&mut rest)?);
    let number_to_return = i32::from_le_bytes(take4(&mut rest)?);
    let query_doc = RawDocument::new(rest)?;
    let query_len = query_doc.declared_len();
    let query = Bytes::copy_from_slice(&rest[..query_len]);
    rest = &rest[query_len..];
    let return_fields_selector = if rest.is_empty() {
        None
    } else {
        let doc = RawDocument::new(rest)?;
        Some(Bytes::copy_from_slice(&rest[..doc.declared_len()]))
    };
    Ok(LegacyQuery {
        header,
        flags,
        full_collection_name,
        number_to_skip,
        number_to_return,
        query,
        return_fields_selector,
    })
}

fn parse_legacy_reply(header: Header, body: &[u8]) -> Result<LegacyReply, MessageError> {
    let mut rest = body;
    let response_flags = i32::from_le_bytes(take4(&mut rest)?);
    let cursor_id = i64::from_le_bytes(take8(&mut rest)?);
    let starting_from = i32::from_le_bytes(take4(&mut rest)?);
    let number_returned = i32::from_le_bytes(take4(&mut rest)?);
    let mut documents = Vec::with_capacity(number_returned.max(0) as usize);
    for _ in 0..number_returned {
        let doc = RawDocument::new(rest)?;
        let len = doc.declared_len();
        documents.push(Bytes::copy_from_slice(&rest[..len]));
        rest = &rest[len..];
    }
    Ok(LegacyReply {
        header,
        response_flags,
        cursor_id,
        starting_from,
        number_returned,
        documents,
    })
}

fn parse_compressed(header: Header, body: &[u8]) -> Result<Message, MessageError> {
    let mut rest = body;
    let original_op_code = i32::from_le_bytes(take4(&mut rest)?);
    let uncompressed_size = i32::from_le_bytes(take4(&mut rest)?);
    let (algo_id, tail) = rest.split_first().ok_or(MessageError::UnsupportedCompression(0))?;
    let algorithm = CompressionAlgorithm::from_id(*algo_id)?;
    let compressed_payload = tail;

    let inflated = decompress(algorithm, compressed_payload)?;
    if inflated.len() != uncompressed_size as usize {
        return Err(MessageError::DecompressionSizeMismatch);
    }

    let mut inner_frame = BytesMut::with_capacity(16 + inflated.len());
    let inner_header = Header {
        message_length: 16 + inflated.len() as i32,
        request_id: header.request_id,
        response_to: header.response_to,
        op_code: original_op_code,
    };
    inner_header.write(&mut inner_frame);
    inner_frame.extend_from_slice(&inflated);

    let payload = Message::parse(&inner_frame)?;
    Ok(Message::Compressed {
        original_op_code,
        uncompressed_size,
        algorithm,
        payload: Box::new(payload),
    })
}

fn decompress(algorithm: CompressionAlgorithm, bytes: &[u8]) -> Result<Vec<u8>, MessageError> {
    match algorithm {
        CompressionAlgorithm::Snappy => {
            let mut decoder = snap::raw::Decoder::new();
            decoder
                .decompress_vec(bytes)
                .map_err(|e| MessageError::Decompression(e.to_string()))
        }
        CompressionAlgorithm::Zlib => {
            use std::io::Read;
            let mut decoder = flate2::read::ZlibDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| MessageError::Decompression(e.to_string()))?;
            Ok(out)
        }
        CompressionAlgorithm::Zstd => {
            zstd::stream::decode_all(bytes).map_err(|e| MessageError::Decompression(e.to_string()))
        }
    }
}

fn take4(rest: &mut &[u8]) -> Result<[u8; 4], MessageError> {
    if rest.len() < 4 {
        return Err(eof("4-byte field"));
    }
    let (head, tail) = rest.split_at(4);
    *rest = tail;
    Ok(head.try_into().unwrap())
}

fn take8(rest: &mut &[u8]) -> Result<[u8; 8], MessageError> {
    if rest.len() < 8 {
        return Err(eof("8-byte field"));
    }
    let (head, tail) = rest.split_at(8);
    *rest = tail;
    Ok(head.try_into().unwrap())
}

fn take_cstring(rest: &mut &[u8]) -> Result<String, MessageError> {
    let end = rest.iter().position(|&b| b == 0).ok_or_else(|| eof("cstring"))?;
    let s = std::str::from_utf8(&rest[..end])
        .map_err(|_| eof("cstring utf8"))?
        .to_string();
    *rest = &rest[end + 1..];
    Ok(s)
}

fn eof(what: &'static str) -> MessageError {
    MessageError::Frame(super::error::FrameError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        what,
    )))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::DocumentBuilder;

    fn hello_doc() -> Bytes {
        let mut b = DocumentBuilder::new();
        b.begin_document(None).unwrap();
        b.append_i32("hello", 1).unwrap();
        b.append_str("$db", "admin").unwrap();
        b.end_document().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn modern_round_trip() {
        let doc = hello_doc();
        let mut body = BytesMut::new();
        body.put_i32_le(0);
        body.put_u8(0);
        body.extend_from_slice(&doc);
        let header = Header {
            message_length: 16 + body.len() as i32,
            request_id: 7,
            response_to: 0,
            op_code: OP_MSG,
        };
        let mut frame = BytesMut::new();
        header.write(&mut frame);
        frame.extend_from_slice(&body);

        let msg = Message::parse(&frame).unwrap();
        match msg {
            Message::Modern(m) => {
                assert_eq!(m.header.request_id, 7);
                let got = m.single_document().unwrap();
                assert_eq!(got.get_i32("hello").unwrap(), Some(1));
            }
            _ => panic!("expected modern message"),
        }
    }

    #[test]
    fn rejects_unsupported_opcode() {
        let mut frame = BytesMut::new();
        let header = Header {
            message_length: 16,
            request_id: 1,
            response_to: 0,
            op_code: 9999,
        };
        header.write(&mut frame);
        assert!(Message::parse(&frame).is_err());
    }

    #[test]
    fn write_modern_reply_sets_response_to() {
        let doc = hello_doc();
        let frame = Message::write_modern_reply(42, 7, doc);
        let msg = Message::parse(&frame).unwrap();
        assert_eq!(msg.header().response_to, 7);
        assert_eq!(msg.header().request_id, 42);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let doc = hello_doc();
        let mut body = BytesMut::new();
        body.put_i32_le(CHECKSUM_PRESENT);
        body.put_u8(0);
        body.extend_from_slice(&doc);
        body.put_u32_le(0xdeadbeef);
        let header = Header {
            message_length: 16 + body.len() as i32,
            request_id: 1,
            response_to: 0,
            op_code: OP_MSG,
        };
        let mut frame = BytesMut::new();
        header.write(&mut frame);
        frame.extend_from_slice(&body);
        assert!(matches!(Message::parse(&frame), Err(MessageError::ChecksumMismatch)));
    }
}
