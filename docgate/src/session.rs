//! Session worker (C8): one task per accepted client socket, running the
//! frame → decode → dispatch → encode → write loop from §4.8. The read
//! buffer lives inside the [`FrameReader`] and is reused across iterations
//! (it grows to the largest message seen and never shrinks within a
//! session, matching the teacher's reused-buffer connection style).
use bytes::Bytes;
use docgate_backend::BackendFactory;
use docgate_pool::Pool;
use docgate_protocol::{FrameReader, Message};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::command::handlers::{self, Context};
use crate::command::{self, DecodeCommandError};
use crate::error::CommandError;
use crate::sql::Postgres;

/// Drives one client connection until it closes or a transport-integrity
/// error occurs. `stream` is split into its read/write halves internally
/// so the frame reader and the reply writer don't fight over one handle.
pub async fn run<S>(mut stream: S, pool: Pool<BackendFactory>, dialect: Postgres)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new();
    let mut request_id = 0i32;

    loop {
        let frame = match reader.read_frame(&mut stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "closing session after frame read error");
                return;
            }
        };

        let message = match Message::parse(&frame) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "closing session after malformed wire message");
                return;
            }
        };

        let (document, response_to, is_legacy) = match message.innermost() {
            Message::Modern(m) => {
                let doc = match m.single_document() {
                    Ok(d) => Bytes::copy_from_slice(d.as_bytes()),
                    Err(e) => {
                        tracing::debug!(error = %e, "closing session after malformed section body");
                        return;
                    }
                };
                (doc, m.header.request_id, false)
            }
            Message::LegacyQuery(q) => (q.query.clone(), q.header.request_id, true),
            other => {
                tracing::debug!(op_code = other.header().op_code, "closing session: unsupported opcode for request");
                return;
            }
        };

        let reply_doc = match command::decode(document, response_to) {
            Ok(cmd) => {
                let ctx = Context { command: &cmd, pool: &pool, dialect: &dialect };
                match handlers::dispatch(&ctx).await {
                    Ok(doc) => doc,
                    Err(e) => error_reply(&e),
                }
            }
            Err(DecodeCommandError::NoCommandField) => error_reply(&CommandError::no_command_field()),
            Err(DecodeCommandError::Malformed(e)) => {
                tracing::debug!(error = %e, "closing session after malformed command document");
                return;
            }
        };

        request_id = request_id.wrapping_add(1);
        let out = if is_legacy {
            Message::write_legacy_reply(request_id, response_to, reply_doc)
        } else {
            Message::write_modern_reply(request_id, response_to, reply_doc)
        };

        if let Err(e) = stream.write_all(&out).await {
            tracing::debug!(error = %e, "closing session after write error");
            return;
        }
    }
}

fn error_reply(e: &CommandError) -> Bytes {
    let mut b = docgate_protocol::DocumentBuilder::new();
    b.begin_document(None).expect("fresh builder");
    b.append_double("ok", 0.0).expect("open document");
    b.append_i32("code", e.code).expect("open document");
    b.append_str("errmsg", &e.errmsg).expect("open document");
    b.end_document().expect("one open container");
    b.finish().expect("fully closed document")
}
