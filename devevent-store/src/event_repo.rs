use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devevent_domain::event::{sample_events, Event, NewEvent};
use devevent_domain::repository::EventRepository;
use devevent_domain::{StoreError, StoreResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the showcase events when the table is empty.
    pub async fn seed_if_empty(&self) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        if count > 0 {
            return Ok(0);
        }

        let samples = sample_events();
        let seeded = samples.len();
        for sample in samples {
            self.create(sample).await?;
        }
        info!("Seeded {} sample events", seeded);
        Ok(seeded)
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    image: String,
    slug: String,
    location: String,
    date: String,
    time: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            image: row.image,
            slug: row.slug,
            location: row.location,
            date: row.date,
            time: row.time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, title, image, slug, location, date, time, created_at, updated_at";

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create(&self, mut event: NewEvent) -> StoreResult<Event> {
        event.validate()?;
        let event = event.into_event(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO events (id, title, image, slug, location, date, time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.image)
        .bind(&event.slug)
        .bind(&event.location)
        .bind(&event.date)
        .bind(&event.time)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        info!("Event created: {} ({})", event.id, event.slug);
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(row.map(Event::from))
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<Event>> {
        // `seq` breaks ties in favour of the later insert.
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY created_at DESC, seq DESC",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }
}
