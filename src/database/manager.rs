use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::models::FlattenError;
use crate::database::repositories::{
    AccountRepository, ChecklistRepository, EventRepository, MenuRepository, SchoolRepository,
    TimetableRepository,
};
use crate::database::schema;

/// Errors from DatabaseManager and the repositories
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Stored row is inconsistent: {0}")]
    Corrupt(#[from] FlattenError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DatabaseError::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DatabaseError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// Owns the process-wide connection pool and hands out repositories
#[derive(Clone, Debug)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// `DATABASE_URL` wins over the individual `DB_*` parts
    pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DatabaseError> {
        if let Some(url) = &config.url {
            return PgConnectOptions::from_str(url).map_err(|_| DatabaseError::InvalidDatabaseUrl);
        }

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.name);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        Ok(options)
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime())
            .idle_timeout(config.idle_timeout())
            .acquire_timeout(config.acquire_timeout())
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = Self::connect_options(config)?;
        let pool = Self::pool_options(config).connect_with(options).await?;
        info!(
            "Connected database pool (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    /// Pool that opens connections on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = Self::connect_options(config)?;
        Ok(Self {
            pool: Self::pool_options(config).connect_lazy_with(options),
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create any missing tables
    pub async fn bootstrap_schema(&self) -> Result<(), DatabaseError> {
        schema::bootstrap(&self.pool).await?;
        info!("Database schema is ready");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.pool.clone())
    }

    pub fn schools(&self) -> SchoolRepository {
        SchoolRepository::new(self.pool.clone())
    }

    pub fn timetables(&self) -> TimetableRepository {
        TimetableRepository::new(self.pool.clone())
    }

    pub fn checklists(&self) -> ChecklistRepository {
        ChecklistRepository::new(self.pool.clone())
    }

    pub fn menus(&self) -> MenuRepository {
        MenuRepository::new(self.pool.clone())
    }

    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            host: "db.internal".to_string(),
            port: 6543,
            user: "school".to_string(),
            password: "pw".to_string(),
            name: "schooldb".to_string(),
            max_connections: 10,
            min_connections: 0,
            max_lifetime_secs: 300,
            idle_timeout_secs: 60,
            acquire_timeout_secs: 5,
        }
    }

    #[test]
    fn builds_options_from_parts() {
        let options = DatabaseManager::connect_options(&config()).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "school");
        assert_eq!(options.get_database(), Some("schooldb"));
    }

    #[test]
    fn url_takes_precedence() {
        let mut config = config();
        config.url = Some("postgres://u:p@elsewhere:5000/other".to_string());
        let options = DatabaseManager::connect_options(&config).unwrap();
        assert_eq!(options.get_host(), "elsewhere");
        assert_eq!(options.get_database(), Some("other"));

        config.url = Some("not a url".to_string());
        assert!(matches!(
            DatabaseManager::connect_options(&config),
            Err(DatabaseError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn maps_driver_errors() {
        assert!(matches!(DatabaseError::from(sqlx::Error::RowNotFound), DatabaseError::NotFound(_)));
        assert!(matches!(DatabaseError::from(sqlx::Error::PoolTimedOut), DatabaseError::Unavailable(_)));
        assert!(matches!(
            DatabaseError::from(sqlx::Error::Protocol("boom".to_string())),
            DatabaseError::Sqlx(_)
        ));
    }
}
