use sqlx::PgPool;

use super::conflict_as;
use crate::database::manager::DatabaseError;
use crate::database::models::School;

const COLUMNS: &str = "id, school_id, region_id, school_name, region_name, organization_email_only, email_domain";

#[derive(Clone)]
pub struct SchoolRepository {
    pool: PgPool,
}

impl SchoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, school: &School) -> Result<School, DatabaseError> {
        let sql = format!(
            "INSERT INTO schools (school_id, region_id, school_name, region_name, organization_email_only, email_domain) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, School>(&sql)
            .bind(&school.school_id)
            .bind(&school.region_id)
            .bind(&school.school_name)
            .bind(&school.region_name)
            .bind(school.organization_email_only)
            .bind(&school.email_domain)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_as(e.into(), "School is already registered"))
    }

    pub async fn find(&self, school_id: &str) -> Result<Option<School>, DatabaseError> {
        let sql = format!("SELECT {} FROM schools WHERE school_id = $1", COLUMNS);
        Ok(sqlx::query_as::<_, School>(&sql)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<School>, DatabaseError> {
        let sql = format!("SELECT {} FROM schools ORDER BY school_id", COLUMNS);
        Ok(sqlx::query_as::<_, School>(&sql).fetch_all(&self.pool).await?)
    }
}
