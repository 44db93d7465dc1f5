use std::time::Duration;

/// Pool sizing and lifecycle policy.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min: usize,
    pub max: usize,
    pub initial: usize,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub validation_interval: Duration,
    pub auto_reconnect: bool,
    pub validate_connections: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 10,
            initial: 0,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10 * 60),
            max_lifetime: Duration::from_secs(30 * 60),
            validation_interval: Duration::from_secs(30),
            auto_reconnect: true,
            validate_connections: true,
        }
    }
}
