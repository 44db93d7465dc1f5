//! The handful of Postgres type oids the translator's result decoding
//! needs to know about. Anything else decodes as text.
pub type Oid = u32;

pub const BOOL: Oid = 16;
pub const INT8: Oid = 20;
pub const INT2: Oid = 21;
pub const INT4: Oid = 23;
pub const TEXT: Oid = 25;
pub const FLOAT4: Oid = 700;
pub const FLOAT8: Oid = 701;
pub const VARCHAR: Oid = 1043;
pub const DATE: Oid = 1082;
pub const TIMESTAMP: Oid = 1114;
pub const TIMESTAMPTZ: Oid = 1184;
pub const NUMERIC: Oid = 1700;
pub const JSON: Oid = 114;
pub const JSONB: Oid = 3802;
