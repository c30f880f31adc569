use sqlx::PgPool;
use uuid::Uuid;

use super::conflict_as;
use crate::database::manager::DatabaseError;
use crate::database::models::{Account, DbId, FlatAccount, PermissionLevel};

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a new account; `id` on the input is ignored
    pub async fn insert(&self, account: &Account) -> Result<Account, DatabaseError> {
        let row = FlatAccount::flatten(account);
        let sql = format!(
            "INSERT INTO accounts (user_id, name, email, password, permission_level, school_id, \
             timetable_entries, timetable_is_public, grade, class, number, checklist_id, friends) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            FlatAccount::COLUMNS
        );

        let stored = sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(row.user_id)
            .bind(&row.name)
            .bind(&row.email)
            .bind(&row.password)
            .bind(row.permission_level)
            .bind(&row.school_id)
            .bind(&row.timetable_entries)
            .bind(row.timetable_is_public)
            .bind(row.grade)
            .bind(row.class)
            .bind(row.number)
            .bind(row.checklist_id)
            .bind(&row.friends)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_as(e.into(), "An account with this email already exists"))?;

        Ok(stored.restore()?)
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Account, DatabaseError> {
        let sql = format!("SELECT {} FROM accounts WHERE user_id = $1", FlatAccount::COLUMNS);
        sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {} not found", user_id)))?
            .restore()
            .map_err(DatabaseError::from)
    }

    pub async fn find_by_id(&self, id: DbId) -> Result<Account, DatabaseError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", FlatAccount::COLUMNS);
        sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {} not found", id)))?
            .restore()
            .map_err(DatabaseError::from)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", FlatAccount::COLUMNS);
        let row = sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FlatAccount::restore).transpose()?)
    }

    pub async fn list(&self, level: Option<PermissionLevel>) -> Result<Vec<Account>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE ($1::SMALLINT IS NULL OR permission_level = $1) ORDER BY id",
            FlatAccount::COLUMNS
        );
        let rows = sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(level.map(PermissionLevel::code))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.restore().map_err(DatabaseError::from))
            .collect()
    }

    /// Writes profile fields. Timetable visibility and the checklist
    /// back-reference have their own operations and are left untouched.
    /// A student's checklist shares are narrowed to the new friend list.
    pub async fn update(&self, account: &Account) -> Result<Account, DatabaseError> {
        let row = FlatAccount::flatten(account);
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE accounts SET name = $2, email = $3, password = $4, permission_level = $5, \
             school_id = $6, timetable_entries = $7, grade = $8, class = $9, number = $10, \
             friends = $11 \
             WHERE user_id = $1 RETURNING {}",
            FlatAccount::COLUMNS
        );

        let updated = sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(row.user_id)
            .bind(&row.name)
            .bind(&row.email)
            .bind(&row.password)
            .bind(row.permission_level)
            .bind(&row.school_id)
            .bind(&row.timetable_entries)
            .bind(row.grade)
            .bind(row.class)
            .bind(row.number)
            .bind(&row.friends)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| conflict_as(e.into(), "An account with this email already exists"))?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {} not found", account.user_id)))?
            .restore()?;

        if let Some(friends) = &row.friends {
            sqlx::query(
                "UPDATE checklist_items ci SET shared_with = ARRAY( \
                     SELECT s FROM unnest(ci.shared_with) WITH ORDINALITY AS t(s, ord) \
                     WHERE s = ANY($2) ORDER BY ord) \
                 FROM checklists c \
                 WHERE ci.checklist_id = c.id AND c.student_id = $1 \
                   AND NOT (ci.shared_with <@ $2)",
            )
            .bind(row.user_id)
            .bind(friends)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Removes the account and every reference other rows hold to it
    pub async fn delete(&self, id: DbId) -> Result<Account, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("DELETE FROM accounts WHERE id = $1 RETURNING {}", FlatAccount::COLUMNS);
        let account = sqlx::query_as::<_, FlatAccount>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {} not found", id)))?
            .restore()?;

        // Timetable rows cascade with a deleted teacher; strip them from students
        sqlx::query(
            "UPDATE accounts SET timetable_entries = ARRAY( \
                 SELECT e FROM unnest(timetable_entries) WITH ORDINALITY AS t(e, ord) \
                 WHERE e IN (SELECT id FROM timetables) ORDER BY ord) \
             WHERE permission_level = 1 \
               AND NOT (timetable_entries <@ ARRAY(SELECT id FROM timetables))",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE accounts SET friends = array_remove(friends, $1) WHERE $1 = ANY(friends)")
            .bind(account.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE checklist_items SET shared_with = array_remove(shared_with, $1) WHERE $1 = ANY(shared_with)",
        )
        .bind(account.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(account)
    }

    /// Lock / unlock. Idempotent.
    pub async fn set_timetable_visibility(&self, user_id: Uuid, is_public: bool) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE accounts SET timetable_is_public = $2 WHERE user_id = $1 AND permission_level = 1",
        )
        .bind(user_id)
        .bind(is_public)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Student {} not found", user_id)));
        }
        Ok(())
    }

    /// Replaces the entry list only; visibility is kept
    pub async fn set_timetable_entries(&self, user_id: Uuid, entries: &[DbId]) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE accounts SET timetable_entries = $2 WHERE user_id = $1 AND permission_level = 1",
        )
        .bind(user_id)
        .bind(entries)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Student {} not found", user_id)));
        }
        Ok(())
    }

    /// True when every id names an existing student
    pub async fn students_exist(&self, user_ids: &[Uuid]) -> Result<bool, DatabaseError> {
        if user_ids.is_empty() {
            return Ok(true);
        }
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT user_id) FROM accounts WHERE user_id = ANY($1) AND permission_level = 1",
        )
        .bind(user_ids)
        .fetch_one(&self.pool)
        .await?;
        let mut unique = user_ids.to_vec();
        unique.sort();
        unique.dedup();
        Ok(count as usize == unique.len())
    }
}
