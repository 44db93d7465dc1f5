//! Assembled configuration, in increasing precedence: built-in defaults, an
//! optional TOML file, `DOCGATE_*` environment variables, then CLI flags.
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_address: String,
    pub bind_port: u16,
    pub max_client_connections: u32,
    pub worker_count_hint: usize,

    pub backend_host: String,
    pub backend_port: u16,
    pub backend_database: String,
    pub backend_user: String,
    pub backend_password: String,

    pub pool_min: usize,
    pub pool_initial: usize,
    pub pool_max: usize,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub max_lifetime_ms: u64,
    pub validation_interval_ms: u64,
    pub auto_reconnect: bool,
    pub validate_connections: bool,

    pub tls_enabled: bool,
    pub shutdown_drain_deadline_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 27017,
            max_client_connections: 1000,
            worker_count_hint: 0,

            backend_host: "127.0.0.1".to_string(),
            backend_port: 5432,
            backend_database: "postgres".to_string(),
            backend_user: "postgres".to_string(),
            backend_password: String::new(),

            pool_min: 0,
            pool_initial: 0,
            pool_max: 10,
            connect_timeout_ms: 5_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: 1_800_000,
            validation_interval_ms: 30_000,
            auto_reconnect: true,
            validate_connections: true,

            tls_enabled: false,
            shutdown_drain_deadline_ms: 5_000,
        }
    }
}

impl GatewayConfig {
    pub fn pool_config(&self) -> docgate_pool::PoolConfig {
        docgate_pool::PoolConfig {
            min: self.pool_min,
            max: self.pool_max,
            initial: self.pool_initial,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            max_lifetime: Duration::from_millis(self.max_lifetime_ms),
            validation_interval: Duration::from_millis(self.validation_interval_ms),
            auto_reconnect: self.auto_reconnect,
            validate_connections: self.validate_connections,
        }
    }

    pub fn backend_options(&self) -> docgate_backend::BackendOptions {
        docgate_backend::BackendOptions {
            host: self.backend_host.clone(),
            port: self.backend_port,
            database: self.backend_database.clone(),
            user: self.backend_user.clone(),
            password: self.backend_password.clone(),
        }
    }

    pub fn shutdown_drain_deadline(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_deadline_ms)
    }

    /// The single entry point `main` calls: defaults, then `--config` TOML
    /// (if given), then `DOCGATE_*` env vars, then CLI flags.
    pub fn from_env_and_args() -> Result<Self> {
        let cli = Cli::parse_args();
        let mut cfg = Self::default();

        if let Some(path) = &cli.config {
            cfg.merge_toml_file(path)?;
        }
        cfg.merge_env();
        cfg.merge_cli(&cli);

        if cfg.tls_enabled {
            return Err(Error::Configuration(
                "TLS was requested but handshake mechanics are out of scope for this gateway".to_string(),
            ));
        }

        Ok(cfg)
    }

    fn merge_toml_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("reading {}: {e}", path.display())))?;
        let table = parse_flat_toml(&text)
            .map_err(|e| Error::Configuration(format!("parsing {}: {e}", path.display())))?;

        macro_rules! str_field {
            ($key:literal, $field:ident) => {
                if let Some(v) = table.get($key) {
                    self.$field = v.clone();
                }
            };
        }
        macro_rules! num_field {
            ($key:literal, $field:ident, $ty:ty) => {
                if let Some(v) = table.get($key) {
                    self.$field = v
                        .parse::<$ty>()
                        .map_err(|_| Error::Configuration(format!("{} is not a valid number: {v}", $key)))?;
                }
            };
        }
        macro_rules! bool_field {
            ($key:literal, $field:ident) => {
                if let Some(v) = table.get($key) {
                    self.$field = v
                        .parse::<bool>()
                        .map_err(|_| Error::Configuration(format!("{} is not a valid boolean: {v}", $key)))?;
                }
            };
        }

        str_field!("bind_address", bind_address);
        num_field!("bind_port", bind_port, u16);
        num_field!("max_client_connections", max_client_connections, u32);
        num_field!("worker_count_hint", worker_count_hint, usize);
        str_field!("backend_host", backend_host);
        num_field!("backend_port", backend_port, u16);
        str_field!("backend_database", backend_database);
        str_field!("backend_user", backend_user);
        str_field!("backend_password", backend_password);
        num_field!("pool_min", pool_min, usize);
        num_field!("pool_initial", pool_initial, usize);
        num_field!("pool_max", pool_max, usize);
        num_field!("connect_timeout_ms", connect_timeout_ms, u64);
        num_field!("idle_timeout_ms", idle_timeout_ms, u64);
        num_field!("max_lifetime_ms", max_lifetime_ms, u64);
        num_field!("validation_interval_ms", validation_interval_ms, u64);
        bool_field!("auto_reconnect", auto_reconnect);
        bool_field!("validate_connections", validate_connections);
        bool_field!("tls_enabled", tls_enabled);
        num_field!("shutdown_drain_deadline_ms", shutdown_drain_deadline_ms, u64);

        Ok(())
    }

    fn merge_env(&mut self) {
        macro_rules! str_env {
            ($key:literal, $field:ident) => {
                if let Ok(v) = std::env::var(concat!("DOCGATE_", $key)) {
                    self.$field = v;
                }
            };
        }
        macro_rules! num_env {
            ($key:literal, $field:ident) => {
                if let Ok(v) = std::env::var(concat!("DOCGATE_", $key)) {
                    if let Ok(n) = v.parse() {
                        self.$field = n;
                    }
                }
            };
        }

        str_env!("BIND_ADDRESS", bind_address);
        num_env!("BIND_PORT", bind_port);
        num_env!("MAX_CLIENT_CONNECTIONS", max_client_connections);
        num_env!("WORKER_COUNT_HINT", worker_count_hint);
        str_env!("BACKEND_HOST", backend_host);
        num_env!("BACKEND_PORT", backend_port);
        str_env!("BACKEND_DATABASE", backend_database);
        str_env!("BACKEND_USER", backend_user);
        str_env!("BACKEND_PASSWORD", backend_password);
        num_env!("POOL_MIN", pool_min);
        num_env!("POOL_INITIAL", pool_initial);
        num_env!("POOL_MAX", pool_max);
        num_env!("CONNECT_TIMEOUT_MS", connect_timeout_ms);
        num_env!("IDLE_TIMEOUT_MS", idle_timeout_ms);
        num_env!("MAX_LIFETIME_MS", max_lifetime_ms);
        num_env!("VALIDATION_INTERVAL_MS", validation_interval_ms);
        num_env!("SHUTDOWN_DRAIN_DEADLINE_MS", shutdown_drain_deadline_ms);
        if let Ok(v) = std::env::var("DOCGATE_AUTO_RECONNECT") {
            if let Ok(b) = v.parse() {
                self.auto_reconnect = b;
            }
        }
        if let Ok(v) = std::env::var("DOCGATE_VALIDATE_CONNECTIONS") {
            if let Ok(b) = v.parse() {
                self.validate_connections = b;
            }
        }
        if let Ok(v) = std::env::var("DOCGATE_TLS_ENABLED") {
            if let Ok(b) = v.parse() {
                self.tls_enabled = b;
            }
        }
    }

    fn merge_cli(&mut self, cli: &Cli) {
        macro_rules! opt {
            ($field:ident) => {
                if let Some(v) = cli.$field.clone() {
                    self.$field = v;
                }
            };
        }
        opt!(bind_address);
        opt!(bind_port);
        opt!(max_client_connections);
        opt!(worker_count_hint);
        opt!(backend_host);
        opt!(backend_port);
        opt!(backend_database);
        opt!(backend_user);
        opt!(backend_password);
        opt!(pool_min);
        opt!(pool_initial);
        opt!(pool_max);
        opt!(connect_timeout_ms);
        opt!(idle_timeout_ms);
        opt!(max_lifetime_ms);
        opt!(validation_interval_ms);
        opt!(shutdown_drain_deadline_ms);
        if cli.tls {
            self.tls_enabled = true;
        }
    }
}

/// A deliberately small TOML subset: flat `key = value` pairs, `#` comments,
/// blank lines, and `[section]` headers (ignored — keys are read as if
/// flattened). No arrays, no nested tables. The gateway's own config shape
/// is flat, and no TOML crate appears anywhere in the example pack to
/// justify pulling one in for this alone; `DESIGN.md` records the trade.
fn parse_flat_toml(text: &str) -> std::result::Result<std::collections::HashMap<String, String>, String> {
    let mut out = std::collections::HashMap::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected `key = value`", lineno + 1))?;
        let key = key.trim().to_string();
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        out.insert(key, value.to_string());
    }
    Ok(out)
}

/// CLI flags, all optional so they only override what was explicitly
/// passed; unset flags leave defaults/file/env values untouched.
#[derive(clap::Parser, Debug)]
#[command(name = "docgate", about = "MongoDB-wire-compatible gateway over a PostgreSQL backend")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind_address: Option<String>,
    #[arg(long)]
    bind_port: Option<u16>,
    #[arg(long)]
    max_client_connections: Option<u32>,
    #[arg(long)]
    worker_count_hint: Option<usize>,

    #[arg(long)]
    backend_host: Option<String>,
    #[arg(long)]
    backend_port: Option<u16>,
    #[arg(long)]
    backend_database: Option<String>,
    #[arg(long)]
    backend_user: Option<String>,
    #[arg(long)]
    backend_password: Option<String>,

    #[arg(long)]
    pool_min: Option<usize>,
    #[arg(long)]
    pool_initial: Option<usize>,
    #[arg(long)]
    pool_max: Option<usize>,
    #[arg(long)]
    connect_timeout_ms: Option<u64>,
    #[arg(long)]
    idle_timeout_ms: Option<u64>,
    #[arg(long)]
    max_lifetime_ms: Option<u64>,
    #[arg(long)]
    validation_interval_ms: Option<u64>,
    /// `--shutdown-timeout-ms` is the documented flag name (§6); it feeds
    /// the config field `shutdown_drain_deadline_ms`.
    #[arg(long = "shutdown-timeout-ms")]
    shutdown_drain_deadline_ms: Option<u64>,

    #[arg(long)]
    tls: bool,
}

impl Cli {
    fn parse_args() -> Self {
        use clap::Parser;
        Self::parse()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_flat_toml_subset() {
        let text = "# comment\nbind_port = 27018\nbackend_host = \"db.internal\"\n\n[ignored]\nauto_reconnect = false\n";
        let table = parse_flat_toml(text).unwrap();
        assert_eq!(table.get("bind_port").unwrap(), "27018");
        assert_eq!(table.get("backend_host").unwrap(), "db.internal");
        assert_eq!(table.get("auto_reconnect").unwrap(), "false");
    }

    #[test]
    fn defaults_round_trip_into_pool_config() {
        let cfg = GatewayConfig::default();
        let pool_cfg = cfg.pool_config();
        assert_eq!(pool_cfg.max, 10);
        assert_eq!(pool_cfg.min, 0);
    }
}
