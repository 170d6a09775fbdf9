use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devevent_domain::booking::Booking;
use devevent_domain::repository::{BookingRepository, EventRepository};
use devevent_domain::{StoreError, StoreResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::event_repo::PgEventRepository;

pub struct PgBookingRepository {
    pool: PgPool,
    events: PgEventRepository,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: PgEventRepository::new(pool.clone()),
            pool,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn save(&self, booking: &mut Booking) -> StoreResult<()> {
        booking.prepare_for_save(&self.events as &dyn EventRepository).await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, event_id, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET event_id = EXCLUDED.event_id, email = EXCLUDED.email, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(booking.id())
        .bind(booking.event_id())
        .bind(booking.email())
        .bind(booking.created_at())
        .bind(booking.updated_at())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        booking.mark_saved();
        info!("Booking saved: {} -> event {}", booking.id(), booking.event_id());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, event_id, email, created_at, updated_at FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(|r| Booking::from_stored(r.id, r.event_id, r.email, r.created_at, r.updated_at)))
    }
}
