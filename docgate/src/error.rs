//! Crate-wide error taxonomy. Transport-integrity failures (frame, message,
//! pool, io) become an [`Error`] and close the session's socket. Everything
//! a client can see as a reply is a [`CommandError`] instead, which never
//! escapes as a Rust-level error — §7 draws this line at the session
//! boundary, not at every function call.
use docgate_protocol::{FrameError, MessageError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Frame(#[from] FrameError),

    #[error("{0}")]
    Protocol(#[from] MessageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Well-known MongoDB-style error codes. Only the ones §7 hands down a
/// literal value for are pinned there (`NO_COMMAND_FIELD`=9,
/// `UNKNOWN_COMMAND`=59, `INTERNAL`=1); the rest are this implementation's
/// choice for the taxonomy entries §7 leaves as "…".
pub mod code {
    pub const INTERNAL_ERROR: i32 = 1;
    pub const FAILED_TO_PARSE: i32 = 9;
    pub const COMMAND_NOT_FOUND: i32 = 59;
    pub const COMMAND_NOT_SUPPORTED: i32 = 115;
    pub const NETWORK_TIMEOUT: i32 = 89;
    pub const OPERATION_FAILED: i32 = 96;
}

/// A command-level failure: never closes the socket, always becomes an
/// `{ok: 0.0, code, errmsg}` reply document.
#[derive(Debug, Clone)]
pub struct CommandError {
    pub code: i32,
    pub errmsg: String,
}

impl CommandError {
    pub fn new(code: i32, errmsg: impl Into<String>) -> Self {
        Self { code, errmsg: errmsg.into() }
    }

    pub fn no_command_field() -> Self {
        Self::new(code::FAILED_TO_PARSE, "no command field found in document")
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::new(code::COMMAND_NOT_FOUND, format!("no such command: '{name}'"))
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::new(code::COMMAND_NOT_SUPPORTED, reason.into())
    }

    pub fn backend_unavailable() -> Self {
        Self::new(code::NETWORK_TIMEOUT, "backend connection pool could not produce a handle in time")
    }

    pub fn backend_failed(errmsg: impl Into<String>) -> Self {
        Self::new(code::OPERATION_FAILED, errmsg.into())
    }

    pub fn internal(errmsg: impl Into<String>) -> Self {
        Self::new(code::INTERNAL_ERROR, errmsg.into())
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.errmsg, self.code)
    }
}

impl std::error::Error for CommandError {}
