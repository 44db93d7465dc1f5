//! Server supervisor (C10): owns the listener and the pool, and drives the
//! `initialize` → `start` → `stop` lifecycle from §4.9. `stop` closes the
//! listener first (no new sessions begin), waits for in-flight session
//! tasks to drain subject to `shutdown_drain_deadline`, then shuts the
//! pool down last.
use docgate_backend::BackendFactory;
use docgate_pool::Pool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};

pub struct Supervisor {
    config: GatewayConfig,
    pool: Pool<BackendFactory>,
}

impl Supervisor {
    pub fn new(config: GatewayConfig) -> Self {
        let factory = BackendFactory { options: config.backend_options() };
        let pool = Pool::new(factory, config.pool_config());
        Self { config, pool }
    }

    /// Top up the pool to `initial` and bind the listening socket, but
    /// accept nothing yet.
    pub async fn initialize(&self) -> Result<TcpListener> {
        self.pool.maintenance_tick().await;
        let addr = format!("{}:{}", self.config.bind_address, self.config.bind_port);
        tracing::info!(%addr, "binding gateway listener");
        TcpListener::bind(&addr).await.map_err(Error::Io)
    }

    /// Accept connections and run the periodic pool maintenance tick until
    /// `shutdown` fires. Returns the spawned per-session task handles so
    /// `stop` can wait on them.
    pub async fn start(
        &self,
        listener: TcpListener,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let maintenance_pool = self.pool.clone();
        let interval = self.config.validation_interval_ms;
        let mut maintenance_shutdown = shutdown.clone();
        let maintenance: JoinHandle<()> = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval));
            loop {
                tokio::select! {
                    biased;
                    _ = maintenance_shutdown.changed() => {
                        if *maintenance_shutdown.borrow() {
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        maintenance_pool.maintenance_tick().await;
                    }
                }
            }
        });

        let mut sessions = crate::listener::accept_loop(listener, self.pool.clone(), shutdown).await;
        sessions.push(maintenance);
        sessions
    }

    /// Wait (bounded by `shutdown_drain_deadline`) for every spawned task
    /// to finish, then shut down the backend pool.
    pub async fn stop(&self, sessions: Vec<JoinHandle<()>>) {
        let deadline = self.config.shutdown_drain_deadline();
        let drain = async {
            for handle in sessions {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(deadline, drain).await.is_err() {
            tracing::warn!("shutdown drain deadline reached with sessions still running");
        }
        self.pool.shutdown(deadline).await;
    }

    /// Run until `SIGINT`/`SIGTERM`, then drain and shut down.
    pub async fn run(self) -> Result<()> {
        let listener = self.initialize().await?;
        let (tx, rx) = tokio::sync::watch::channel(false);
        let sessions = self.start(listener, rx).await;

        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, draining sessions");
        let _ = tx.send(true);

        self.stop(sessions).await;
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
