use async_trait::async_trait;
use devevent_domain::repository::{BookingRepository, Datastore, EventRepository};
use devevent_domain::{StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::app_config::DatabaseConfig;
use crate::booking_repo::PgBookingRepository;
use crate::connection::{Connect, ConnectionCache, ConnectionState};
use crate::event_repo::PgEventRepository;

/// Opens a Postgres pool, eagerly: a bad URL or unreachable server fails the
/// attempt right away instead of surfacing on the first query.
pub struct PgConnector {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    run_migrations: bool,
    seed_sample_events: bool,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            run_migrations: config.run_migrations,
            seed_sample_events: config.seed_sample_events,
        }
    }
}

#[async_trait]
impl Connect for PgConnector {
    type Conn = PgPool;
    type Error = StoreError;

    async fn connect(&self) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.url)
            .await
            .map_err(StoreError::backend)?;

        if self.run_migrations {
            info!("Running database migrations...");
            sqlx::migrate!("../migrations")
                .run(&pool)
                .await
                .map_err(StoreError::backend)?;
            info!("Migrations completed successfully.");

            if self.seed_sample_events {
                PgEventRepository::new(pool.clone()).seed_if_empty().await?;
            }
        }

        Ok(pool)
    }
}

/// Postgres-backed datastore. The pool is opened on first use and shared by
/// every request afterwards.
pub struct PgDatastore {
    cache: ConnectionCache<PgConnector>,
}

impl PgDatastore {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            cache: ConnectionCache::new(PgConnector::new(config)),
        }
    }

    pub async fn pool(&self) -> StoreResult<PgPool> {
        match self.cache.get().await {
            Ok(pool) => Ok(pool),
            Err(e) => {
                debug!("Database unavailable, connection state: {:?}", self.connection_state().await);
                Err(StoreError::Connection(e.to_string()))
            }
        }
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.cache.state().await
    }
}

#[async_trait]
impl Datastore for PgDatastore {
    async fn events(&self) -> StoreResult<Arc<dyn EventRepository>> {
        Ok(Arc::new(PgEventRepository::new(self.pool().await?)))
    }

    async fn bookings(&self) -> StoreResult<Arc<dyn BookingRepository>> {
        Ok(Arc::new(PgBookingRepository::new(self.pool().await?)))
    }
}
