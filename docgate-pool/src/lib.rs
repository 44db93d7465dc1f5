//! Generic bounded connection pool.
//!
//! Mirrors the shape of a hand-rolled database driver's pool (one mutex
//! guarding two disjoint collections, a condition variable for waiters) but
//! generalized over any connection type via [`Factory`], so the same pool
//! machinery backs whatever concrete backend connection `docgate-backend`
//! provides.
//!
//! Liveness validation always happens with the guard released: an
//! `acquire` that pops an available connection drops the lock before
//! calling [`Factory::validate`], and only re-acquires it to either hand
//! the connection to the caller or tear it down and retry.
mod config;
mod error;

pub use config::PoolConfig;
pub use error::PoolError;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Produces and validates connections of a concrete backend type. The pool
/// itself never knows what a connection *is* beyond this contract.
pub trait Factory: Send + Sync + 'static {
    type Connection: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// A cheap liveness probe (e.g. `SELECT 1`), run with the pool's lock
    /// released.
    fn validate(&self, conn: &mut Self::Connection) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

struct Managed<C> {
    conn: C,
    created_at: Instant,
    last_used: Instant,
}

impl<C> Managed<C> {
    fn fresh(conn: C) -> Self {
        let now = Instant::now();
        Self {
            conn,
            created_at: now,
            last_used: now,
        }
    }
}

struct Guarded<C> {
    available: VecDeque<Managed<C>>,
    in_use: usize,
    total: usize,
}

struct PoolState<F: Factory> {
    factory: F,
    config: PoolConfig,
    guarded: Mutex<Guarded<F::Connection>>,
    notify: Notify,
    shutting_down: AtomicBool,
}

/// A bounded pool of `F::Connection`. Cheap to clone; clones share the same
/// underlying state.
pub struct Pool<F: Factory> {
    state: Arc<PoolState<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub available: usize,
    pub in_use: usize,
    pub total: usize,
}

impl<F: Factory> Pool<F> {
    /// Build a pool without eagerly creating any connections. Call
    /// [`Pool::maintenance_tick`] once, or let the supervisor's background
    /// task do so, to top up to `config.initial`.
    pub fn new(factory: F, config: PoolConfig) -> Self {
        Self {
            state: Arc::new(PoolState {
                factory,
                config,
                guarded: Mutex::new(Guarded {
                    available: VecDeque::new(),
                    in_use: 0,
                    total: 0,
                }),
                notify: Notify::new(),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let g = self.state.guarded.lock().unwrap();
        PoolStats {
            available: g.available.len(),
            in_use: g.in_use,
            total: g.total,
        }
    }

    /// Acquire exclusive use of a connection, creating one if the pool has
    /// headroom or waiting for a release otherwise. Bounded by
    /// `config.connect_timeout`.
    pub async fn acquire(&self) -> Result<Handle<F>, PoolError<F::Error>> {
        let deadline = Instant::now() + self.state.config.connect_timeout;

        loop {
            if self.state.shutting_down.load(Ordering::Acquire) {
                return Err(PoolError::ShuttingDown);
            }

            enum Action<C> {
                Use(Managed<C>),
                Create,
                Wait,
            }

            let action = {
                let mut g = self.state.guarded.lock().unwrap();
                if let Some(managed) = g.available.pop_front() {
                    g.in_use += 1;
                    Action::Use(managed)
                } else if g.total < self.state.config.max {
                    g.total += 1;
                    Action::Create
                } else {
                    Action::Wait
                }
            };

            match action {
                Action::Use(mut managed) => {
                    if self.state.config.validate_connections {
                        if let Err(e) = self.state.factory.validate(&mut managed.conn).await {
                            tracing::warn!(error = %e, "pooled connection failed liveness check, discarding");
                            let mut g = self.state.guarded.lock().unwrap();
                            g.in_use -= 1;
                            g.total -= 1;
                            drop(g);
                            self.state.notify.notify_one();
                            if Instant::now() >= deadline {
                                return Err(PoolError::Timeout);
                            }
                            continue;
                        }
                    }
                    managed.last_used = Instant::now();
                    return Ok(Handle {
                        pool: self.clone(),
                        managed: Some(managed),
                        broken: false,
                    });
                }
                Action::Create => match self.state.factory.connect().await {
                    Ok(conn) => {
                        let mut g = self.state.guarded.lock().unwrap();
                        g.in_use += 1;
                        drop(g);
                        return Ok(Handle {
                            pool: self.clone(),
                            managed: Some(Managed::fresh(conn)),
                            broken: false,
                        });
                    }
                    Err(e) => {
                        let mut g = self.state.guarded.lock().unwrap();
                        g.total -= 1;
                        drop(g);
                        self.state.notify.notify_one();
                        if !self.state.config.auto_reconnect {
                            return Err(PoolError::Connect(e));
                        }
                        tracing::warn!(error = %e, "backend connect failed, retrying");
                        if Instant::now() >= deadline {
                            return Err(PoolError::Timeout);
                        }
                        continue;
                    }
                },
                Action::Wait => {
                    let notified = self.state.notify.notified();
                    tokio::pin!(notified);
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Err(PoolError::Timeout);
                    }
                }
            }
        }
    }

    /// Evict connections past `idle_timeout`/`max_lifetime`, then top up to
    /// `config.min`. Intended to be called on a fixed interval
    /// (`config.validation_interval`) by the server supervisor.
    pub async fn maintenance_tick(&self) {
        {
            let mut g = self.state.guarded.lock().unwrap();
            let now = Instant::now();
            let mut keep = VecDeque::with_capacity(g.available.len());
            while let Some(m) = g.available.pop_front() {
                let expired = now.duration_since(m.created_at) > self.state.config.max_lifetime
                    || now.duration_since(m.last_used) > self.state.config.idle_timeout;
                if expired {
                    g.total -= 1;
                } else {
                    keep.push_back(m);
                }
            }
            g.available = keep;
        }

        loop {
            {
                let g = self.state.guarded.lock().unwrap();
                if g.total >= self.state.config.min || g.total >= self.state.config.max {
                    return;
                }
            }
            {
                let mut g = self.state.guarded.lock().unwrap();
                g.total += 1;
            }
            match self.state.factory.connect().await {
                Ok(conn) => {
                    let mut g = self.state.guarded.lock().unwrap();
                    g.available.push_back(Managed::fresh(conn));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "maintenance top-up failed");
                    let mut g = self.state.guarded.lock().unwrap();
                    g.total -= 1;
                    return;
                }
            }
        }
    }

    /// Stop accepting new acquires and wait up to `drain_deadline` for
    /// in-flight handles to be released, then drop all idle connections.
    pub async fn shutdown(&self, drain_deadline: Duration) {
        self.state.shutting_down.store(true, Ordering::Release);
        self.state.notify.notify_waiters();

        let deadline = tokio::time::Instant::now() + drain_deadline;
        loop {
            {
                let g = self.state.guarded.lock().unwrap();
                if g.in_use == 0 {
                    break;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("pool shutdown drain deadline reached with connections still in use");
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let mut g = self.state.guarded.lock().unwrap();
        g.available.clear();
        g.total = g.in_use;
    }
}

/// An exclusively-owned, borrowed connection. Returned to the pool's
/// `available` set on drop unless [`Handle::mark_broken`] was called.
pub struct Handle<F: Factory> {
    pool: Pool<F>,
    managed: Option<Managed<F::Connection>>,
    broken: bool,
}

impl<F: Factory> Handle<F> {
    /// Mark this connection as unusable; it is destroyed instead of
    /// returned to `available` when the handle is dropped.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<F: Factory> std::ops::Deref for Handle<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        &self.managed.as_ref().expect("handle used after drop").conn
    }
}

impl<F: Factory> std::ops::DerefMut for Handle<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.managed.as_mut().expect("handle used after drop").conn
    }
}

impl<F: Factory> Drop for Handle<F> {
    fn drop(&mut self) {
        let Some(managed) = self.managed.take() else { return };
        let mut g = self.pool.state.guarded.lock().unwrap();
        g.in_use -= 1;
        if self.broken {
            g.total -= 1;
        } else {
            g.available.push_back(managed);
        }
        drop(g);
        self.pool.state.notify.notify_one();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, thiserror::Error)]
    #[error("connect failed")]
    struct TestError;

    struct CountingFactory {
        created: AtomicUsize,
        fail_validate: AtomicBool,
    }

    impl Factory for Arc<CountingFactory> {
        type Connection = usize;
        type Error = TestError;

        async fn connect(&self) -> Result<usize, TestError> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        async fn validate(&self, _conn: &mut usize) -> Result<(), TestError> {
            if self.fail_validate.load(Ordering::SeqCst) {
                Err(TestError)
            } else {
                Ok(())
            }
        }
    }

    fn test_config(max: usize) -> PoolConfig {
        PoolConfig {
            min: 0,
            max,
            initial: 0,
            connect_timeout: Duration::from_millis(200),
            ..PoolConfig::default()
        }
    }

    #[tokio::test]
    async fn acquire_creates_up_to_max_then_waits() {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            fail_validate: AtomicBool::new(false),
        });
        let pool = Pool::new(factory, test_config(1));

        let h1 = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().in_use, 1);

        let pool2 = pool.clone();
        let waiter = tokio::spawn(async move { pool2.acquire().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(h1);

        let h2 = waiter.await.unwrap().unwrap();
        assert_eq!(pool.stats().in_use, 1);
        drop(h2);
    }

    #[tokio::test]
    async fn broken_handle_is_not_reused() {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            fail_validate: AtomicBool::new(false),
        });
        let pool = Pool::new(factory, test_config(2));

        let mut h = pool.acquire().await.unwrap();
        h.mark_broken();
        drop(h);

        assert_eq!(pool.stats().total, 0);
    }

    #[tokio::test]
    async fn acquire_times_out_when_exhausted() {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            fail_validate: AtomicBool::new(false),
        });
        let pool = Pool::new(factory, test_config(1));
        let _h = pool.acquire().await.unwrap();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::Timeout));
    }

    #[tokio::test]
    async fn invalid_connection_is_discarded_and_replaced() {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            fail_validate: AtomicBool::new(false),
        });
        let pool = Pool::new(factory.clone(), test_config(1));

        let h = pool.acquire().await.unwrap();
        drop(h);
        factory.fail_validate.store(true, Ordering::SeqCst);

        // the pooled connection fails validation; pool discards it, drops
        // below max, and connects a fresh one (validation re-fails
        // endlessly with this factory, so bound the attempt with a timeout).
        let result = tokio::time::timeout(Duration::from_millis(100), pool.acquire()).await;
        assert!(result.is_err() || result.unwrap().is_err());
    }
}
