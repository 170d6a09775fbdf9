use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::Booking;
use crate::event::{Event, NewEvent};
use crate::StoreResult;

/// Repository trait for event data access
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Validates the draft, assigns an identifier and writes it.
    async fn create(&self, event: NewEvent) -> StoreResult<Event>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// All events, most recently created first.
    async fn list_newest_first(&self) -> StoreResult<Vec<Event>>;
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Runs `Booking::prepare_for_save` and writes the booking if it passes.
    /// Inserts new bookings and updates loaded ones.
    async fn save(&self, booking: &mut Booking) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>>;
}

/// Hands out repositories bound to a live connection.
///
/// Obtaining a repository is what warms the connection, so handlers call
/// these before doing any other external work.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn events(&self) -> StoreResult<Arc<dyn EventRepository>>;

    async fn bookings(&self) -> StoreResult<Arc<dyn BookingRepository>>;
}
