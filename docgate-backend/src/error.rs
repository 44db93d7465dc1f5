//! Backend driver errors. `DatabaseError` corresponds to the gateway's
//! `BACKEND_FAILED` kind; everything else here corresponds to
//! `BACKEND_UNAVAILABLE` (a connection that could not be established or
//! kept alive at all).

/// A decoded Postgres `ErrorResponse`: the fields a client actually needs
/// to report a useful `errmsg`/`code` back to the document-protocol caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{severity}: {message} ({code})")]
pub struct DatabaseError {
    pub severity: String,
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
}

impl DatabaseError {
    pub(crate) fn from_fields(body: &[u8]) -> Self {
        let mut severity = String::new();
        let mut code = String::new();
        let mut message = String::new();
        let mut detail = None;

        let mut rest = body;
        while let Some((&tag, tail)) = rest.split_first() {
            if tag == 0 {
                break;
            }
            let Some(end) = tail.iter().position(|&b| b == 0) else { break };
            let value = String::from_utf8_lossy(&tail[..end]).into_owned();
            rest = &tail[end + 1..];
            match tag {
                b'S' => severity = value,
                b'C' => code = value,
                b'M' => message = value,
                b'D' => detail = Some(value),
                _ => {}
            }
        }

        Self { severity, code, message, detail }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("backend closed the connection during startup")]
    StartupClosed,

    #[error("unsupported authentication method requested by backend")]
    UnsupportedAuth,

    #[error("backend rejected startup: {0}")]
    Rejected(#[from] DatabaseError),

    #[error("malformed message from backend: {0}")]
    Protocol(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("malformed message from backend: {0}")]
    Protocol(&'static str),
}
