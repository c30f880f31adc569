use std::sync::Arc;
use std::time::Duration;

use crate::auth::oauth::{GoogleProvider, IdentityProvider, OAuthError};
use crate::auth::password::DecoyHash;
use crate::auth::{AuthError, RsaKeyPair, TokenAlgorithm, TokenIssuer};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::map_store::MapStore;

/// Everything a handler needs, shared across requests
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    /// Server RSA key: signs RS256 sessions and opens sealed request bodies
    pub keys: Arc<RsaKeyPair>,
    pub tokens: Arc<TokenIssuer>,
    /// `None` when OAuth credentials are not configured
    pub oauth: Option<Arc<dyn IdentityProvider>>,
    pub maps: MapStore,
    /// Burned on logins for unknown emails
    pub decoy_hash: DecoyHash,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseManager, keys: RsaKeyPair) -> Result<Self, StateError> {
        let lifetime = config.token_lifetime();
        let tokens = match config.security.token_algorithm {
            TokenAlgorithm::HS256 => TokenIssuer::hmac(&config.security.secret_key, lifetime)?,
            TokenAlgorithm::RS256 => TokenIssuer::rsa(&keys, lifetime),
        };

        let oauth = match config.oauth.credentials() {
            Some((client_id, client_secret)) => {
                let provider = GoogleProvider::new(
                    client_id,
                    client_secret,
                    config.oauth.redirect_url.clone(),
                    Duration::from_secs(config.oauth.timeout_secs),
                )?;
                Some(Arc::new(provider) as Arc<dyn IdentityProvider>)
            }
            None => None,
        };

        let maps = MapStore::new(config.server.map_dir.clone(), config.api.max_map_size_bytes);

        Ok(Self {
            config: Arc::new(config),
            db,
            keys: Arc::new(keys),
            tokens: Arc::new(tokens),
            oauth,
            maps,
            decoy_hash: DecoyHash::default(),
        })
    }

    /// Swap the identity provider (tests point this at a local mock)
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.oauth = Some(provider);
        self
    }

    pub fn identity_provider(&self) -> Result<&Arc<dyn IdentityProvider>, OAuthError> {
        self.oauth.as_ref().ok_or(OAuthError::Disabled)
    }
}
