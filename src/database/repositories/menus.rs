use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use super::conflict_as;
use crate::database::manager::DatabaseError;
use crate::database::models::menu::MenuRow;
use crate::database::models::{CafeteriaMenu, DbId, MenuEntry};

const DUPLICATE_MEAL: &str = "A menu for this school, date and meal already exists";

#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

async fn insert_items(conn: &mut PgConnection, menu_id: DbId, items: &[MenuEntry]) -> Result<(), DatabaseError> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO cafeteria_menu_items (menu_id, position, name, contents, allergies) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(menu_id)
        .bind(position as i32)
        .bind(&item.name)
        .bind(&item.contents)
        .bind(&item.allergies)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_items(conn: &mut PgConnection, menu_id: DbId) -> Result<Vec<MenuEntry>, DatabaseError> {
    Ok(sqlx::query_as::<_, MenuEntry>(
        "SELECT name, contents, allergies FROM cafeteria_menu_items WHERE menu_id = $1 ORDER BY position",
    )
    .bind(menu_id)
    .fetch_all(conn)
    .await?)
}

impl MenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Menu row and items commit together or not at all
    pub async fn insert(&self, menu: &CafeteriaMenu) -> Result<CafeteriaMenu, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MenuRow>(
            "INSERT INTO cafeteria_menus (school_id, meal_name, date) VALUES ($1, $2, $3) \
             RETURNING id, school_id, meal_name, date",
        )
        .bind(&menu.school_id)
        .bind(&menu.meal_name)
        .bind(menu.date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_as(e.into(), DUPLICATE_MEAL))?;

        insert_items(&mut *tx, row.id, &menu.items).await?;
        tx.commit().await?;
        Ok(row.with_items(menu.items.clone()))
    }

    pub async fn find(&self, id: DbId) -> Result<CafeteriaMenu, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, MenuRow>(
            "SELECT id, school_id, meal_name, date FROM cafeteria_menus WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Menu {} not found", id)))?;
        let items = load_items(&mut *conn, row.id).await?;
        Ok(row.with_items(items))
    }

    pub async fn list_for_date(&self, school_id: &str, date: NaiveDate) -> Result<Vec<CafeteriaMenu>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, MenuRow>(
            "SELECT id, school_id, meal_name, date FROM cafeteria_menus \
             WHERE school_id = $1 AND date = $2 ORDER BY id",
        )
        .bind(school_id)
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;

        let mut menus = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items(&mut *conn, row.id).await?;
            menus.push(row.with_items(items));
        }
        Ok(menus)
    }

    pub async fn replace(&self, id: DbId, menu: &CafeteriaMenu) -> Result<CafeteriaMenu, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MenuRow>(
            "UPDATE cafeteria_menus SET school_id = $2, meal_name = $3, date = $4 WHERE id = $1 \
             RETURNING id, school_id, meal_name, date",
        )
        .bind(id)
        .bind(&menu.school_id)
        .bind(&menu.meal_name)
        .bind(menu.date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_as(e.into(), DUPLICATE_MEAL))?
        .ok_or_else(|| DatabaseError::NotFound(format!("Menu {} not found", id)))?;

        sqlx::query("DELETE FROM cafeteria_menu_items WHERE menu_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut *tx, id, &menu.items).await?;

        tx.commit().await?;
        Ok(row.with_items(menu.items.clone()))
    }

    pub async fn delete(&self, id: DbId) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM cafeteria_menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Menu {} not found", id)));
        }
        Ok(())
    }
}
