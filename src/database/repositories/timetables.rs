use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{DbId, NewTimetableEntry, TimetableEntry};

const COLUMNS: &str = "id, teacher_id, location, day, period, subject";

#[derive(Clone)]
pub struct TimetableRepository {
    pool: PgPool,
}

impl TimetableRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, teacher_id: Uuid, entry: &NewTimetableEntry) -> Result<TimetableEntry, DatabaseError> {
        let sql = format!(
            "INSERT INTO timetables (teacher_id, location, day, period, subject) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            COLUMNS
        );
        Ok(sqlx::query_as::<_, TimetableEntry>(&sql)
            .bind(teacher_id)
            .bind(&entry.location)
            .bind(&entry.day)
            .bind(&entry.period)
            .bind(&entry.subject)
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn find(&self, id: DbId) -> Result<TimetableEntry, DatabaseError> {
        let sql = format!("SELECT {} FROM timetables WHERE id = $1", COLUMNS);
        sqlx::query_as::<_, TimetableEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Timetable entry {} not found", id)))
    }

    /// Entries in the order of `ids`; unknown ids are skipped
    pub async fn find_many(&self, ids: &[DbId]) -> Result<Vec<TimetableEntry>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, TimetableEntry>(
            "SELECT t.id, t.teacher_id, t.location, t.day, t.period, t.subject \
             FROM unnest($1::BIGINT[]) WITH ORDINALITY AS wanted(id, ord) \
             JOIN timetables t ON t.id = wanted.id \
             ORDER BY wanted.ord",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<TimetableEntry>, DatabaseError> {
        let sql = format!("SELECT {} FROM timetables WHERE teacher_id = $1 ORDER BY id", COLUMNS);
        Ok(sqlx::query_as::<_, TimetableEntry>(&sql)
            .bind(teacher_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn update(&self, id: DbId, entry: &NewTimetableEntry) -> Result<TimetableEntry, DatabaseError> {
        let sql = format!(
            "UPDATE timetables SET location = $2, day = $3, period = $4, subject = $5 \
             WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, TimetableEntry>(&sql)
            .bind(id)
            .bind(&entry.location)
            .bind(&entry.day)
            .bind(&entry.period)
            .bind(&entry.subject)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Timetable entry {} not found", id)))
    }

    /// Deletes the entry and removes it from every student's timetable
    pub async fn delete(&self, id: DbId) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM timetables WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Timetable entry {} not found", id)));
        }

        sqlx::query(
            "UPDATE accounts SET timetable_entries = array_remove(timetable_entries, $1) \
             WHERE $1 = ANY(timetable_entries)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn all_exist(&self, ids: &[DbId]) -> Result<bool, DatabaseError> {
        if ids.is_empty() {
            return Ok(true);
        }
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM timetables WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize == ids.len())
    }
}
