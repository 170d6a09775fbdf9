use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Something that can open a connection handle.
///
/// `Conn` is cloned out to every caller, so it should be a cheap handle such
/// as a pool.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Conn: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Conn, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
}

type Attempt<C, E> = Shared<BoxFuture<'static, Result<C, Arc<E>>>>;

enum Slot<C, E> {
    Uninitialized,
    Connecting(Attempt<C, E>),
    Ready(C),
    Failed,
}

/// Memoizes a single connection handle with single-flight semantics.
///
/// Callers arriving while an attempt is in flight await that same attempt
/// rather than starting their own. A failed attempt is not cached: the slot
/// moves to `Failed` and the next caller starts over.
pub struct ConnectionCache<K: Connect> {
    connector: Arc<K>,
    slot: Mutex<Slot<K::Conn, K::Error>>,
}

impl<K: Connect> ConnectionCache<K> {
    pub fn new(connector: K) -> Self {
        Self {
            connector: Arc::new(connector),
            slot: Mutex::new(Slot::Uninitialized),
        }
    }

    pub async fn get(&self) -> Result<K::Conn, Arc<K::Error>> {
        let attempt = {
            let mut slot = self.slot.lock().await;

            // Every waiter may have been dropped after the attempt finished,
            // leaving it unsettled. Settle it here from its stored output.
            if let Slot::Connecting(attempt) = &*slot {
                match attempt.peek() {
                    Some(Ok(conn)) => {
                        let conn = conn.clone();
                        *slot = Slot::Ready(conn);
                    }
                    Some(Err(e)) => {
                        warn!("Discarding finished failed connection attempt: {}", e);
                        *slot = Slot::Failed;
                    }
                    None => {}
                }
            }

            match &*slot {
                Slot::Ready(conn) => return Ok(conn.clone()),
                Slot::Connecting(attempt) => attempt.clone(),
                Slot::Uninitialized | Slot::Failed => {
                    info!("Opening database connection...");
                    let connector = self.connector.clone();
                    let attempt = async move { connector.connect().await.map_err(Arc::new) }
                        .boxed()
                        .shared();
                    *slot = Slot::Connecting(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        // Only the attempt that still owns the slot may settle it.
        let mut slot = self.slot.lock().await;
        if let Slot::Connecting(current) = &*slot {
            if current.ptr_eq(&attempt) {
                *slot = match &result {
                    Ok(conn) => {
                        info!("Database connection established");
                        Slot::Ready(conn.clone())
                    }
                    Err(e) => {
                        warn!("Database connection failed: {}", e);
                        Slot::Failed
                    }
                };
            }
        }

        result
    }

    pub async fn state(&self) -> ConnectionState {
        match &*self.slot.lock().await {
            Slot::Uninitialized => ConnectionState::Uninitialized,
            Slot::Connecting(_) => ConnectionState::Connecting,
            Slot::Ready(_) => ConnectionState::Ready,
            Slot::Failed => ConnectionState::Failed,
        }
    }
}
