//! Listener (C9): accept loop, one spawned session task per socket.
use docgate_backend::BackendFactory;
use docgate_pool::Pool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::sql::Postgres;

/// Runs until `shutdown` resolves, then stops accepting and returns. The
/// caller (the supervisor) is responsible for waiting out already-spawned
/// session tasks afterward.
pub async fn accept_loop(
    listener: TcpListener,
    pool: Pool<BackendFactory>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut sessions = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return sessions;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        tracing::debug!(%addr, "accepted client connection");
                        let pool = pool.clone();
                        let dialect = Postgres;
                        sessions.push(tokio::spawn(async move {
                            crate::session::run(socket, pool, dialect).await;
                        }));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}
