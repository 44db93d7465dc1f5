//! docgate: a network gateway speaking a MongoDB-compatible document-wire
//! protocol on its client edge and PostgreSQL's wire protocol on its
//! backend edge. See `DESIGN.md` for the component-by-component grounding
//! ledger.
pub mod command;
pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod session;
pub mod sql;
pub mod supervisor;
