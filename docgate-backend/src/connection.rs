//! A single backend TCP connection: startup handshake, simple query,
//! extended (parameterized) query, and a liveness probe. One instance is
//! exactly one pool handle's worth of backend connection.
use bytes::Buf;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::{ConnectError, QueryError};
use crate::message::{self, ColumnInfo, RawBackendMessage};
use crate::options::BackendOptions;
use crate::row::BackendRow;

use std::sync::Arc;

pub struct BackendConnection {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
    process_id: i32,
    secret_key: i32,
}

/// `ok` / `ok AND n rows affected` outcome of a statement that doesn't
/// return rows, decoded from `CommandComplete`'s tag (e.g. `"UPDATE 3"`).
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub tag: String,
    pub rows_affected: i64,
}

impl CommandOutcome {
    fn from_tag(tag: String) -> Self {
        let rows_affected = tag
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(0);
        Self { tag, rows_affected }
    }
}

pub struct QueryResult {
    pub columns: Arc<[ColumnInfo]>,
    pub rows: Vec<BackendRow>,
    pub outcome: CommandOutcome,
}

impl BackendConnection {
    pub async fn connect(options: &BackendOptions) -> Result<Self, ConnectError> {
        let stream = TcpStream::connect((options.host.as_str(), options.port)).await?;
        stream.set_nodelay(true).ok();
        let (read_half, write_half) = stream.into_split();
        let mut conn = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            process_id: 0,
            secret_key: 0,
        };
        conn.startup(options).await?;
        Ok(conn)
    }

    async fn startup(&mut self, options: &BackendOptions) -> Result<(), ConnectError> {
        let msg = message::startup(&options.user, &options.database);
        self.writer.write_all(&msg).await?;
        self.writer.flush().await?;

        loop {
            let RawBackendMessage { tag, mut body } = message::read_message(&mut self.reader).await?;
            match tag {
                message::AUTHENTICATION => {
                    let kind = body.get_i32();
                    match kind {
                        0 => break, // AuthenticationOk
                        3 => {
                            let msg = message::password_message(&options.password);
                            self.writer.write_all(&msg).await?;
                            self.writer.flush().await?;
                        }
                        _ => return Err(ConnectError::UnsupportedAuth),
                    }
                }
                message::ERROR_RESPONSE => {
                    return Err(ConnectError::Rejected(message::decode_error_response(&body)));
                }
                _ => return Err(ConnectError::Protocol("unexpected message during authentication")),
            }
        }

        loop {
            let RawBackendMessage { tag, body } = message::read_message(&mut self.reader).await?;
            match tag {
                message::BACKEND_KEY_DATA => {
                    let mut b = body;
                    self.process_id = b.get_i32();
                    self.secret_key = b.get_i32();
                }
                message::PARAMETER_STATUS => {}
                message::NOTICE_RESPONSE => {
                    tracing::warn!(notice = %String::from_utf8_lossy(&body), "backend notice during startup");
                }
                message::READY_FOR_QUERY => break,
                message::ERROR_RESPONSE => {
                    return Err(ConnectError::Rejected(message::decode_error_response(&body)));
                }
                _ => return Err(ConnectError::Protocol("unexpected message before ReadyForQuery")),
            }
        }

        Ok(())
    }

    /// The simple query protocol: no parameters, results decoded as text.
    /// Used for administrative statements and the liveness probe.
    pub async fn simple_query(&mut self, sql: &str) -> Result<QueryResult, QueryError> {
        let msg = message::query(sql);
        self.writer.write_all(&msg).await?;
        self.writer.flush().await?;
        self.drain_query_response().await
    }

    /// Parse + Bind + Execute with text-format parameters, results decoded
    /// as text. The unnamed prepared statement and portal are closed
    /// implicitly by the next `Sync`.
    pub async fn extended_query(&mut self, sql: &str, params: &[Option<&str>]) -> Result<QueryResult, QueryError> {
        let msg = message::parse_bind_execute(sql, params);
        self.writer.write_all(&msg).await?;
        self.writer.write_all(&message::sync_message()).await?;
        self.writer.flush().await?;

        let RawBackendMessage { tag, body } = message::read_message(&mut self.reader).await?;
        match tag {
            message::PARSE_COMPLETE => {}
            message::ERROR_RESPONSE => {
                self.resync_after_error().await?;
                return Err(message::decode_error_response(&body).into());
            }
            _ => return Err(QueryError::Protocol("expected ParseComplete")),
        }

        let RawBackendMessage { tag, body } = message::read_message(&mut self.reader).await?;
        match tag {
            message::BIND_COMPLETE => {}
            message::ERROR_RESPONSE => {
                self.resync_after_error().await?;
                return Err(message::decode_error_response(&body).into());
            }
            _ => return Err(QueryError::Protocol("expected BindComplete")),
        }

        let result = self.drain_execute_response().await;
        // Extended flow always ends with Sync -> ReadyForQuery, already
        // consumed inside drain_execute_response / resync_after_error.
        result
    }

    async fn drain_query_response(&mut self) -> Result<QueryResult, QueryError> {
        let mut columns: Arc<[ColumnInfo]> = Arc::from(Vec::new());
        let mut rows = Vec::new();
        let mut outcome = CommandOutcome::from_tag(String::new());
        let mut pending_error = None;

        loop {
            let RawBackendMessage { tag, body } = message::read_message(&mut self.reader).await?;
            match tag {
                message::ROW_DESCRIPTION => {
                    columns = Arc::from(message::decode_row_description(body).map_err(|_| QueryError::Protocol("row description"))?);
                }
                message::DATA_ROW => {
                    let values = message::decode_data_row(body);
                    rows.push(BackendRow { columns: columns.clone(), values });
                }
                message::COMMAND_COMPLETE => {
                    outcome = CommandOutcome::from_tag(message::decode_command_tag(body));
                }
                message::ERROR_RESPONSE => {
                    pending_error = Some(message::decode_error_response(&body));
                }
                message::READY_FOR_QUERY => break,
                message::NOTICE_RESPONSE => {
                    tracing::warn!(notice = %String::from_utf8_lossy(&body), "backend notice");
                }
                _ => {}
            }
        }

        match pending_error {
            Some(e) => Err(e.into()),
            None => Ok(QueryResult { columns, rows, outcome }),
        }
    }

    async fn drain_execute_response(&mut self) -> Result<QueryResult, QueryError> {
        let mut columns: Arc<[ColumnInfo]> = Arc::from(Vec::new());
        let mut rows = Vec::new();
        let mut outcome = CommandOutcome::from_tag(String::new());
        let mut pending_error = None;

        loop {
            let RawBackendMessage { tag, body } = message::read_message(&mut self.reader).await?;
            match tag {
                message::DATA_ROW => {
                    let values = message::decode_data_row(body);
                    rows.push(BackendRow { columns: columns.clone(), values });
                }
                message::COMMAND_COMPLETE => {
                    outcome = CommandOutcome::from_tag(message::decode_command_tag(body));
                }
                message::ERROR_RESPONSE => {
                    pending_error = Some(message::decode_error_response(&body));
                }
                message::READY_FOR_QUERY => break,
                b'n' | b's' => {} // NoData / PortalSuspended
                _ => {}
            }
        }

        match pending_error {
            Some(e) => Err(e.into()),
            None => Ok(QueryResult { columns, rows, outcome }),
        }
    }

    /// Drains to the `ReadyForQuery` produced by the `Sync` `extended_query`
    /// already pipelined after Parse/Bind/Execute — does not send another
    /// one, which would desync the stream by one `ReadyForQuery`.
    async fn resync_after_error(&mut self) -> Result<(), QueryError> {
        loop {
            let RawBackendMessage { tag, .. } = message::read_message(&mut self.reader).await?;
            if tag == message::READY_FOR_QUERY {
                return Ok(());
            }
        }
    }

    /// Cheap liveness probe, run by the pool with its lock released.
    pub async fn ping(&mut self) -> Result<(), QueryError> {
        self.simple_query("SELECT 1").await.map(|_| ())
    }
}

/// Bridges [`BackendConnection`] into [`docgate_pool::Factory`].
pub struct BackendFactory {
    pub options: BackendOptions,
}

impl docgate_pool::Factory for BackendFactory {
    type Connection = BackendConnection;
    type Error = ConnectError;

    async fn connect(&self) -> Result<BackendConnection, ConnectError> {
        BackendConnection::connect(&self.options).await
    }

    async fn validate(&self, conn: &mut BackendConnection) -> Result<(), ConnectError> {
        conn.ping().await.map_err(|_| ConnectError::Protocol("liveness probe failed"))
    }
}
