use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::watch;
use tracing::warn;

use crate::config::{AppConfig, JwtConfig};
use crate::db::{always_ready, ConnectionState, StoreHandle};
use crate::ledger::{CreditStore, LedgerService};
use crate::storage::{MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CreditStore>,
    pub ledger: LedgerService,
    pub connection: watch::Receiver<ConnectionState>,
}

impl FromRef<AppState> for Arc<dyn CreditStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl AppState {
    /// Connects the configured store. The returned handle is `None` for the in-memory store.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, Option<StoreHandle>)> {
        let config = Arc::new(config);

        let Some(db_cfg) = config.db.as_ref() else {
            warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
            let store = Arc::new(MemoryStore::new()) as Arc<dyn CreditStore>;
            return Ok((Self::from_parts(config, store, always_ready()), None));
        };

        let handle = StoreHandle::new(db_cfg)?;
        handle.wait_ready().await?;
        handle.migrate().await?;

        let store = Arc::new(PgStore::new(handle.pool().clone())) as Arc<dyn CreditStore>;
        let state = Self::from_parts(config, store, handle.subscribe());
        Ok((state, Some(handle)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn CreditStore>,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            config,
            store,
            connection,
        }
    }

    /// In-memory state with fixed JWT settings, for tests.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            db: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            host: "127.0.0.1".into(),
            port: 0,
            seed_admin: None,
        });
        let store = Arc::new(MemoryStore::new()) as Arc<dyn CreditStore>;
        Self::from_parts(config, store, always_ready())
    }
}
