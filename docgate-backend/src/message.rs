//! PostgreSQL frontend/backend message framing: a one-byte type tag (frontend
//! startup has none) followed by a 4-byte big-endian length inclusive of
//! itself, then the message body.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ConnectError, DatabaseError};

pub const AUTHENTICATION: u8 = b'R';
pub const BACKEND_KEY_DATA: u8 = b'K';
pub const BIND_COMPLETE: u8 = b'2';
pub const CLOSE_COMPLETE: u8 = b'3';
pub const COMMAND_COMPLETE: u8 = b'C';
pub const DATA_ROW: u8 = b'D';
pub const ERROR_RESPONSE: u8 = b'E';
pub const NOTICE_RESPONSE: u8 = b'N';
pub const PARAMETER_STATUS: u8 = b'S';
pub const PARSE_COMPLETE: u8 = b'1';
pub const READY_FOR_QUERY: u8 = b'Z';
pub const ROW_DESCRIPTION: u8 = b'T';

/// A decoded backend message: the raw tag plus its body, left for the
/// caller to interpret according to the protocol phase it's in (mirrors a
/// driver's `match_backend!`-style dispatch without needing one type per
/// tag).
pub struct RawBackendMessage {
    pub tag: u8,
    pub body: Bytes,
}

/// Read one backend message off `reader`.
pub async fn read_message<R>(reader: &mut R) -> Result<RawBackendMessage, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 5];
    reader.read_exact(&mut header).await?;
    let tag = header[0];
    let len = u32::from_be_bytes(header[1..5].try_into().unwrap()) as usize;
    let mut body = vec![0u8; len.saturating_sub(4)];
    reader.read_exact(&mut body).await?;
    Ok(RawBackendMessage { tag, body: Bytes::from(body) })
}

fn write_tagged(buf: &mut BytesMut, tag: u8, body: impl FnOnce(&mut BytesMut)) {
    buf.put_u8(tag);
    let len_at = buf.len();
    buf.put_u32(0);
    let before = buf.len();
    body(buf);
    let written = (buf.len() - before) as u32 + 4;
    buf[len_at..len_at + 4].copy_from_slice(&written.to_be_bytes());
}

fn put_nul_string(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}

/// The untagged startup message: protocol version, then `user`/`database`
/// parameter pairs, terminated by a zero byte.
pub fn startup(user: &str, database: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    let len_at = buf.len();
    buf.put_u32(0);
    buf.put_u32(196_608); // protocol 3.0
    put_nul_string(&mut buf, "user");
    put_nul_string(&mut buf, user);
    put_nul_string(&mut buf, "database");
    put_nul_string(&mut buf, database);
    buf.put_u8(0);
    let total = buf.len() as u32;
    buf[len_at..len_at + 4].copy_from_slice(&total.to_be_bytes());
    buf
}

pub fn password_message(password: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    write_tagged(&mut buf, b'p', |b| put_nul_string(b, password));
    buf
}

pub fn query(sql: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    write_tagged(&mut buf, b'Q', |b| put_nul_string(b, sql));
    buf
}

/// Parse + Bind + Execute + Flush, batched into one write, matching the
/// simple-flow extended query pattern: an unnamed prepared statement and
/// portal, closed by the caller once results are drained.
pub fn parse_bind_execute(sql: &str, params: &[Option<&str>]) -> BytesMut {
    let mut buf = BytesMut::new();

    write_tagged(&mut buf, b'P', |b| {
        put_nul_string(b, "");
        put_nul_string(b, sql);
        b.put_u16(0); // let the backend infer parameter types
    });

    write_tagged(&mut buf, b'B', |b| {
        put_nul_string(b, "");
        put_nul_string(b, "");
        b.put_u16(1); // one parameter format code applies to all params
        b.put_u16(0); // text
        b.put_u16(params.len() as u16);
        for p in params {
            match p {
                Some(text) => {
                    b.put_i32(text.len() as i32);
                    b.put_slice(text.as_bytes());
                }
                None => b.put_i32(-1),
            }
        }
        b.put_u16(1); // one result format code applies to all columns
        b.put_u16(0); // text
    });

    write_tagged(&mut buf, b'E', |b| {
        put_nul_string(b, "");
        b.put_u32(0); // no row limit
    });

    write_tagged(&mut buf, b'H', |_| {}); // Flush
    buf
}

pub fn sync_message() -> BytesMut {
    let mut buf = BytesMut::new();
    write_tagged(&mut buf, b'S', |_| {});
    buf
}

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub type_oid: u32,
}

pub fn decode_row_description(mut body: Bytes) -> Result<Vec<ColumnInfo>, ConnectError> {
    let count = body.get_i16();
    let mut columns = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let name = take_nul_string(&mut body)?;
        let _table_oid = body.get_i32();
        let _attr_num = body.get_i16();
        let type_oid = body.get_u32();
        let _type_size = body.get_i16();
        let _type_modifier = body.get_i32();
        let _format_code = body.get_i16();
        columns.push(ColumnInfo { name, type_oid });
    }
    Ok(columns)
}

pub fn decode_data_row(mut body: Bytes) -> Vec<Option<Bytes>> {
    let count = body.get_i16();
    let mut values = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let len = body.get_i32();
        if len < 0 {
            values.push(None);
        } else {
            values.push(Some(body.split_to(len as usize)));
        }
    }
    values
}

pub fn decode_command_tag(body: Bytes) -> String {
    String::from_utf8_lossy(&body[..body.len().saturating_sub(1)]).into_owned()
}

pub fn decode_error_response(body: &[u8]) -> DatabaseError {
    DatabaseError::from_fields(body)
}

fn take_nul_string(body: &mut Bytes) -> Result<String, ConnectError> {
    let end = body
        .iter()
        .position(|&b| b == 0)
        .ok_or(ConnectError::Protocol("missing nul terminator"))?;
    let s = String::from_utf8_lossy(&body[..end]).into_owned();
    body.advance(end + 1);
    Ok(s)
}
