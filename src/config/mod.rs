use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::auth::TokenAlgorithm;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Uploaded school maps live here as `<school_id>.<ext>`
    pub map_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub request_timeout_secs: u64,
    pub max_request_size_bytes: usize,
    pub max_map_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub token_algorithm: TokenAlgorithm,
    /// HS256 signing secret (`SECRET_KEY`)
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub private_key_path: PathBuf,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    /// Refuse plain-JSON credentials and requests without `Client-Public-Key`
    pub require_envelope: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub redirect_url: String,
    pub timeout_secs: u64,
}

impl OAuthConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

impl DatabaseConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)?;

        config.validate()?;
        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(v) = lookup("PORT") {
            self.server.port = parse("PORT", v)?;
        }
        if let Some(v) = lookup("MAP_DIR") {
            self.server.map_dir = PathBuf::from(v);
        }

        // Database
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = parse("DB_PORT", v)?;
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", v)?;
        }
        if let Some(v) = lookup("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = parse("DATABASE_MIN_CONNECTIONS", v)?;
        }
        if let Some(v) = lookup("DATABASE_MAX_LIFETIME_SECS") {
            self.database.max_lifetime_secs = parse("DATABASE_MAX_LIFETIME_SECS", v)?;
        }
        if let Some(v) = lookup("DATABASE_IDLE_TIMEOUT_SECS") {
            self.database.idle_timeout_secs = parse("DATABASE_IDLE_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = parse("DATABASE_ACQUIRE_TIMEOUT_SECS", v)?;
        }

        // API
        if let Some(v) = lookup("API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = parse("API_REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = parse("API_MAX_REQUEST_SIZE_BYTES", v)?;
        }

        // Security
        if let Some(v) = lookup("TOKEN_ALGORITHM") {
            self.security.token_algorithm = parse("TOKEN_ALGORITHM", v)?;
        }
        if let Some(v) = lookup("SECRET_KEY") {
            self.security.secret_key = v;
        }
        if let Some(v) = lookup("PRIVATE_KEY_PATH") {
            self.security.private_key_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse("SECURITY_JWT_EXPIRY_HOURS", v)?;
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            self.security.bcrypt_cost = parse("BCRYPT_COST", v)?;
        }
        if let Some(v) = lookup("SECURITY_REQUIRE_ENVELOPE") {
            self.security.require_envelope = parse("SECURITY_REQUIRE_ENVELOPE", v)?;
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // OAuth
        if let Some(v) = lookup("OAUTH_ID") {
            self.oauth.client_id = non_empty(v);
        }
        if let Some(v) = lookup("OAUTH_SECRET") {
            self.oauth.client_secret = non_empty(v);
        }
        if let Some(v) = lookup("OAUTH_REDIRECT_URL") {
            self.oauth.redirect_url = v;
        }
        if let Some(v) = lookup("OAUTH_TIMEOUT_SECS") {
            self.oauth.timeout_secs = parse("OAUTH_TIMEOUT_SECS", v)?;
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.token_algorithm == TokenAlgorithm::HS256 && self.security.secret_key.is_empty() {
            return Err(ConfigError::Missing("SECRET_KEY"));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: self.security.bcrypt_cost.to_string(),
                reason: "must be between 4 and 31".to_string(),
            });
        }
        if self.security.jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SECURITY_JWT_EXPIRY_HOURS",
                value: self.security.jwt_expiry_hours.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.database.url.is_none() && self.database.name.is_empty() {
            return Err(ConfigError::Missing("DB_NAME"));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MIN_CONNECTIONS",
                value: self.database.min_connections.to_string(),
                reason: "exceeds DATABASE_MAX_CONNECTIONS".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.security.jwt_expiry_hours)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn base() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                map_dir: PathBuf::from("./maps"),
            },
            database: DatabaseConfig {
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "school".to_string(),
                max_connections: 10,
                min_connections: 0,
                max_lifetime_secs: 300,
                idle_timeout_secs: 60,
                acquire_timeout_secs: 5,
            },
            api: ApiConfig {
                request_timeout_secs: 30,
                max_request_size_bytes: 12 * 1024 * 1024,
                max_map_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                token_algorithm: TokenAlgorithm::RS256,
                secret_key: String::new(),
                private_key_path: PathBuf::from("./private.pem"),
                jwt_expiry_hours: 24,
                bcrypt_cost: 10,
                require_envelope: false,
                cors_origins: vec!["*".to_string()],
            },
            oauth: OAuthConfig {
                client_id: None,
                client_secret: None,
                redirect_url: "http://localhost:8080/auth/oauthsuccess".to_string(),
                timeout_secs: 10,
            },
        }
    }

    fn development() -> Self {
        Self::base()
    }

    fn staging() -> Self {
        let mut config = Self::base();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.min_connections = 2;
        config.security.bcrypt_cost = 12;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.min_connections = 5;
        config.api.request_timeout_secs = 15;
        config.security.bcrypt_cost = 12;
        config.security.require_envelope = true;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.security.token_algorithm, TokenAlgorithm::RS256);
        assert_eq!(config.security.jwt_expiry_hours, 24);
        assert_eq!(config.api.max_map_size_bytes, 10 * 1024 * 1024);
        assert!(!config.security.require_envelope);
        assert!(config.oauth.credentials().is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.security.bcrypt_cost, 12);
        assert!(config.security.require_envelope);
        assert_eq!(config.database.max_connections, 50);
    }

    #[test]
    fn reads_database_and_oauth_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_USER", "school"),
            ("DB_PASSWORD", "pw"),
            ("DB_NAME", "schooldb"),
            ("PORT", "9000"),
            ("OAUTH_ID", "id"),
            ("OAUTH_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.name, "schooldb");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.oauth.credentials(), Some(("id", "secret")));
    }

    #[test]
    fn hmac_mode_requires_secret() {
        let err = AppConfig::from_lookup(lookup(&[("TOKEN_ALGORITHM", "HS256")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SECRET_KEY")));

        let config =
            AppConfig::from_lookup(lookup(&[("TOKEN_ALGORITHM", "HS256"), ("SECRET_KEY", "s3cret")])).unwrap();
        assert_eq!(config.security.token_algorithm, TokenAlgorithm::HS256);
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("BCRYPT_COST", "2")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BCRYPT_COST", .. }));

        let err = AppConfig::from_lookup(lookup(&[("TOKEN_ALGORITHM", "none")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_ALGORITHM", .. }));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = AppConfig::from_lookup(lookup(&[("DB_PASSWORD", "pw"), ("OAUTH_SECRET", "shh")])).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("\"pw\""));
        assert!(!json.contains("shh"));
    }
}
