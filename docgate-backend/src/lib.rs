//! Hand-rolled PostgreSQL wire client: the gateway's only outbound
//! protocol. Deliberately narrow — simple query, one-shot extended query
//! with text-format parameters, and a liveness probe — since the gateway
//! never needs cursors, COPY, or statement caching beyond what
//! [`docgate_pool::Pool`] already gives it via pooled connections.
mod connection;
mod error;
mod message;
pub mod oid;
mod options;
mod row;

pub use connection::{BackendConnection, BackendFactory, CommandOutcome, QueryResult};
pub use error::{ConnectError, DatabaseError, QueryError};
pub use message::ColumnInfo;
pub use options::BackendOptions;
pub use row::{BackendRow, BackendValue};
