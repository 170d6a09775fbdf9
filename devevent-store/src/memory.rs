//! In-process datastore with the same write-path rules as Postgres. Backs
//! the HTTP tests and `database.url = "memory://"` local runs.

use async_trait::async_trait;
use chrono::Utc;
use devevent_domain::booking::Booking;
use devevent_domain::event::{sample_events, Event, NewEvent};
use devevent_domain::repository::{BookingRepository, Datastore, EventRepository};
use devevent_domain::StoreResult;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryEventRepository {
    // Insertion order; listing walks it backwards.
    rows: RwLock<Vec<Event>>,
}

impl MemoryEventRepository {
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn create(&self, mut event: NewEvent) -> StoreResult<Event> {
        event.validate()?;
        let event = event.into_event(Utc::now());
        self.rows.write().await.push(event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.rows.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.rows.read().await.iter().rev().cloned().collect();
        // Stable: equal timestamps keep the later insert first.
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }
}

pub struct MemoryBookingRepository {
    rows: RwLock<Vec<Booking>>,
    events: Arc<MemoryEventRepository>,
}

impl MemoryBookingRepository {
    pub fn new(events: Arc<MemoryEventRepository>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            events,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn save(&self, booking: &mut Booking) -> StoreResult<()> {
        booking.prepare_for_save(self.events.as_ref()).await?;
        booking.mark_saved();

        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|b| b.id() == booking.id()) {
            Some(existing) => *existing = booking.clone(),
            None => rows.push(booking.clone()),
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|b| b.id() == id).map(|b| {
            Booking::from_stored(b.id(), b.event_id(), b.email().to_string(), b.created_at(), b.updated_at())
        }))
    }
}

#[derive(Clone)]
pub struct MemoryDatastore {
    pub events: Arc<MemoryEventRepository>,
    pub bookings: Arc<MemoryBookingRepository>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        let events = Arc::new(MemoryEventRepository::default());
        let bookings = Arc::new(MemoryBookingRepository::new(events.clone()));
        Self { events, bookings }
    }

    pub async fn with_sample_events() -> StoreResult<Self> {
        let store = Self::new();
        for sample in sample_events() {
            store.events.create(sample).await?;
        }
        Ok(store)
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn events(&self) -> StoreResult<Arc<dyn EventRepository>> {
        Ok(self.events.clone())
    }

    async fn bookings(&self) -> StoreResult<Arc<dyn BookingRepository>> {
        Ok(self.bookings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devevent_domain::{StoreError, ValidationError};

    fn draft(title: &str) -> NewEvent {
        NewEvent::from_fields(vec![
            ("title", title),
            ("image", "https://cdn.example.com/e.png"),
            ("location", "Online"),
            ("date", "2026-02-01"),
            ("time", "10:00 AM"),
        ])
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryDatastore::new();
        for title in ["first", "second", "third"] {
            store.events.create(draft(title)).await.unwrap();
        }

        let titles: Vec<String> = store
            .events
            .list_newest_first()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_invalid_event_is_not_written() {
        let store = MemoryDatastore::new();
        let err = store.events.create(draft("")).await.unwrap_err();

        assert!(matches!(err, StoreError::Validation(ValidationError::Required("Title"))));
        assert!(store.events.is_empty().await);
    }

    #[tokio::test]
    async fn test_dangling_booking_is_not_written() {
        let store = MemoryDatastore::new();
        let mut booking = Booking::new(Uuid::new_v4(), "a@example.com");

        let err = store.bookings.save(&mut booking).await.unwrap_err();
        assert_eq!(err.to_string(), "Referenced event does not exist");
        assert!(store.bookings.is_empty().await);
    }

    #[tokio::test]
    async fn test_booking_round_trip_and_update() {
        let store = MemoryDatastore::new();
        let event = store.events.create(draft("meetup")).await.unwrap();

        let mut booking = Booking::new(event.id, " A@Example.COM ");
        store.bookings.save(&mut booking).await.unwrap();
        assert!(booking.is_persisted());

        let mut loaded = store.bookings.find_by_id(booking.id()).await.unwrap().unwrap();
        assert_eq!(loaded.email(), "a@example.com");
        assert!(!loaded.is_event_changed());

        loaded.set_email("b@example.com");
        store.bookings.save(&mut loaded).await.unwrap();
        assert_eq!(store.bookings.len().await, 1);
    }

    #[tokio::test]
    async fn test_sample_seed() {
        let store = MemoryDatastore::with_sample_events().await.unwrap();
        let events = store.events.list_newest_first().await.unwrap();

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].slug, "startup-pitch-night");
    }
}
