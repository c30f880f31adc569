use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::{DbId, EventEntry, Events};

#[derive(FromRow)]
struct EventsRow {
    id: DbId,
    school_id: String,
    month: i16,
    events: Json<Vec<EventEntry>>,
}

impl From<EventsRow> for Events {
    fn from(row: EventsRow) -> Self {
        Events {
            id: row.id,
            school_id: row.school_id,
            month: row.month,
            events: row.events.0,
        }
    }
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the calendar for one school month
    pub async fn upsert(&self, events: &Events) -> Result<Events, DatabaseError> {
        let row = sqlx::query_as::<_, EventsRow>(
            "INSERT INTO schoolevents (school_id, month, events) VALUES ($1, $2, $3) \
             ON CONFLICT (school_id, month) DO UPDATE SET events = EXCLUDED.events \
             RETURNING id, school_id, month, events",
        )
        .bind(&events.school_id)
        .bind(events.month)
        .bind(Json(&events.events))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn find_month(&self, school_id: &str, month: i16) -> Result<Events, DatabaseError> {
        sqlx::query_as::<_, EventsRow>(
            "SELECT id, school_id, month, events FROM schoolevents WHERE school_id = $1 AND month = $2",
        )
        .bind(school_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?
        .map(Events::from)
        .ok_or_else(|| DatabaseError::NotFound(format!("No events for month {}", month)))
    }
}
