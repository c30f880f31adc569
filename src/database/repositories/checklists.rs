use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::checklist::ChecklistRow;
use crate::database::models::{Checklist, ChecklistItem, DbId};

#[derive(Clone)]
pub struct ChecklistRepository {
    pool: PgPool,
}

async fn insert_items(conn: &mut PgConnection, checklist_id: DbId, items: &[ChecklistItem]) -> Result<(), DatabaseError> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO checklist_items (checklist_id, position, text, complete, is_public, shared_with) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(checklist_id)
        .bind(position as i32)
        .bind(&item.text)
        .bind(item.complete)
        .bind(item.is_public)
        .bind(&item.shared_with)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_items(conn: &mut PgConnection, checklist_id: DbId) -> Result<Vec<ChecklistItem>, DatabaseError> {
    Ok(sqlx::query_as::<_, ChecklistItem>(
        "SELECT text, complete, is_public, shared_with FROM checklist_items \
         WHERE checklist_id = $1 ORDER BY position",
    )
    .bind(checklist_id)
    .fetch_all(conn)
    .await?)
}

impl ChecklistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the student's only checklist. A second attempt is a conflict,
    /// decided by the unique index rather than a prior lookup.
    pub async fn create_for_student(
        &self,
        student_id: Uuid,
        title: &str,
        items: &[ChecklistItem],
    ) -> Result<Checklist, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChecklistRow>(
            "INSERT INTO checklists (student_id, title) VALUES ($1, $2) \
             ON CONFLICT (student_id) DO NOTHING RETURNING id, student_id, title",
        )
        .bind(student_id)
        .bind(title)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::Conflict("Student already has a checklist".to_string()))?;

        insert_items(&mut *tx, row.id, items).await?;

        sqlx::query("UPDATE accounts SET checklist_id = $1 WHERE user_id = $2")
            .bind(row.id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.with_items(items.to_vec()))
    }

    pub async fn find(&self, id: DbId) -> Result<Checklist, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, ChecklistRow>("SELECT id, student_id, title FROM checklists WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Checklist {} not found", id)))?;
        let items = load_items(&mut *conn, row.id).await?;
        Ok(row.with_items(items))
    }

    pub async fn find_by_student(&self, student_id: Uuid) -> Result<Checklist, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, ChecklistRow>(
            "SELECT id, student_id, title FROM checklists WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Checklist not found".to_string()))?;
        let items = load_items(&mut *conn, row.id).await?;
        Ok(row.with_items(items))
    }

    /// Replace title and items atomically
    pub async fn replace(&self, id: DbId, title: &str, items: &[ChecklistItem]) -> Result<Checklist, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChecklistRow>(
            "UPDATE checklists SET title = $2 WHERE id = $1 RETURNING id, student_id, title",
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Checklist {} not found", id)))?;

        sqlx::query("DELETE FROM checklist_items WHERE checklist_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut *tx, id, items).await?;

        tx.commit().await?;
        Ok(row.with_items(items.to_vec()))
    }

    /// Lock / unlock every item of the student's checklist
    pub async fn set_visibility(&self, student_id: Uuid, is_public: bool) -> Result<Checklist, DatabaseError> {
        let checklist = self.find_by_student(student_id).await?;
        sqlx::query("UPDATE checklist_items SET is_public = $2 WHERE checklist_id = $1")
            .bind(checklist.id)
            .bind(is_public)
            .execute(&self.pool)
            .await?;

        let items = checklist
            .items
            .into_iter()
            .map(|item| ChecklistItem { is_public, ..item })
            .collect();
        Ok(Checklist { items, ..checklist })
    }

    pub async fn delete(&self, id: DbId) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let (student_id,): (Uuid,) = sqlx::query_as("DELETE FROM checklists WHERE id = $1 RETURNING student_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Checklist {} not found", id)))?;

        sqlx::query("UPDATE accounts SET checklist_id = NULL WHERE user_id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
