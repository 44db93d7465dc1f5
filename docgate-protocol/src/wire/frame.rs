//! Exact-length frame reading. A frame is the 4-byte length prefix plus
//! `length - 4` more bytes; nothing shorter or longer is ever handed
//! upward.
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::FrameError;

pub const HEADER_LEN: usize = 16;
pub const MIN_FRAME_LEN: i32 = HEADER_LEN as i32;
pub const MAX_FRAME_LEN: i32 = 48_000_000;

/// Reads whole frames off an async byte stream, reusing one growing buffer
/// across calls so a session's steady-state message size needs only a
/// single allocation.
pub struct FrameReader {
    buf: BytesMut,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Read the next frame, or `Ok(None)` if the stream hit EOF before any
    /// byte of a new frame arrived (a clean close between messages). An EOF
    /// in the middle of a frame is `Err`.
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Option<BytesMut>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let mut len_bytes = [0u8; 4];
        let n = read_up_to(reader, &mut len_bytes).await?;
        if n == 0 {
            return Ok(None);
        }
        if n < 4 {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "eof while reading frame length",
            )));
        }
        let declared = i32::from_le_bytes(len_bytes);
        if declared < MIN_FRAME_LEN || declared > MAX_FRAME_LEN {
            return Err(FrameError::InvalidLength(declared));
        }

        self.buf.clear();
        self.buf.reserve(declared as usize);
        self.buf.extend_from_slice(&len_bytes);

        let remaining = declared as usize - 4;
        let mut rest = vec![0u8; remaining];
        reader.read_exact(&mut rest).await.map_err(FrameError::Io)?;
        self.buf.extend_from_slice(&rest);

        Ok(Some(std::mem::replace(&mut self.buf, BytesMut::new())))
    }
}

/// Like `read_exact`, but returns the number of bytes actually read instead
/// of erroring on a zero-byte read, so the caller can distinguish "EOF
/// before this frame started" from "EOF mid-frame".
async fn read_up_to<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Serialize a complete frame: 4-byte length prefix (computed from `body`'s
/// length, inclusive of the prefix itself) followed by `body`.
pub fn write_frame(body: &[u8]) -> BytesMut {
    let total = body.len() as i32 + 4;
    let mut out = BytesMut::with_capacity(total as usize);
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn reads_exact_frame() {
        let body = b"hello world";
        let mut wire = Vec::new();
        let total = (body.len() + 4) as i32;
        wire.extend_from_slice(&total.to_le_bytes());
        wire.extend_from_slice(body);

        let mut cursor = std::io::Cursor::new(wire);
        let mut reader = FrameReader::new();
        let frame = reader.read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(&frame[4..], body);
    }

    #[tokio::test]
    async fn clean_eof_before_frame_is_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new();
        assert!(reader.read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_oversize_length() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        let mut cursor = std::io::Cursor::new(wire);
        let mut reader = FrameReader::new();
        assert!(reader.read_frame(&mut cursor).await.is_err());
    }
}
