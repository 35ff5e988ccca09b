use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::DbConfig;

/// Lifecycle of the database connection as seen by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ConnectionState {
    Init,
    Ready,
    Retrying { attempt: u32 },
    Closed,
}

/// A receiver that always reads `Ready`, for stores without a connection.
pub fn always_ready() -> watch::Receiver<ConnectionState> {
    let (_tx, rx) = watch::channel(ConnectionState::Ready);
    rx
}

/// Owns the Postgres pool and publishes its [`ConnectionState`].
#[derive(Clone)]
pub struct StoreHandle {
    pool: PgPool,
    cfg: DbConfig,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl StoreHandle {
    /// Builds the pool without connecting; call [`StoreHandle::wait_ready`] next.
    pub fn new(cfg: &DbConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .connect_lazy(&cfg.url)
            .context("parse database url")?;
        let (state, _) = watch::channel(ConnectionState::Init);
        Ok(Self {
            pool,
            cfg: cfg.clone(),
            state: Arc::new(state),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Pings until the database answers, backing off `base * attempt` (capped) between tries.
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let mut attempt: u32 = 0;
        let mut hint_shown = false;
        loop {
            attempt += 1;
            match self.ping().await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(attempt, "database connection recovered");
                    } else {
                        info!("database connected");
                    }
                    self.state.send_replace(ConnectionState::Ready);
                    return Ok(());
                }
                Err(e) => {
                    let msg = format!("{e:#}");
                    error!(attempt, error = %msg, "database connection failed");
                    if !hint_shown && msg.contains("pg_hba.conf") {
                        hint_shown = true;
                        warn!("the database rejected this host; add it to the server's pg_hba.conf allow-list");
                    }
                    if self.cfg.retry_max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(e.context(format!("database unreachable after {attempt} attempt(s)")));
                    }
                    self.state.send_replace(ConnectionState::Retrying { attempt });
                    let delay = self.cfg.retry_delay(attempt);
                    info!(delay_ms = delay.as_millis() as u64, "retrying database connection");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Re-checks the connection every `every` and republishes state until closed.
    pub fn spawn_monitor(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                if handle.state() == ConnectionState::Closed {
                    return;
                }
                if let Err(e) = handle.ping().await {
                    warn!(error = %e, "database connection lost; reconnecting");
                    if let Err(e) = handle.wait_ready().await {
                        error!(error = %e, "database reconnection gave up");
                    }
                }
            }
        })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        self.state.send_replace(ConnectionState::Closed);
        info!("database connection closed");
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }
}
