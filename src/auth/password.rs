use std::sync::Arc;
use tokio::sync::OnceCell;

use super::AuthError;

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Hash on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String, cost: u32) -> Result<Vec<u8>, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map(String::into_bytes)
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// `false` on mismatch and on unreadable stored hashes
pub async fn verify_password(password: String, stored: Vec<u8>) -> bool {
    let result = tokio::task::spawn_blocking(move || {
        let stored = String::from_utf8(stored).map_err(|e| e.to_string())?;
        bcrypt::verify(password, &stored).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}

/// Hash verified when a login names no account, so unknown and known emails
/// cost the same bcrypt work. Built on first use at the configured cost.
#[derive(Clone, Default)]
pub struct DecoyHash {
    hash: Arc<OnceCell<Vec<u8>>>,
}

impl DecoyHash {
    pub fn is_built(&self) -> bool {
        self.hash.initialized()
    }

    pub async fn verify(&self, password: String, cost: u32) {
        let hash = match self
            .hash
            .get_or_try_init(|| hash_password(DECOY_PASSWORD.to_string(), cost))
            .await
        {
            Ok(hash) => hash.clone(),
            Err(e) => {
                tracing::error!("Decoy hash could not be built: {}", e);
                return;
            }
        };
        verify_password(password, hash).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("abc123".to_string(), 4).await.unwrap();
        assert!(hash.starts_with(b"$2"));
        assert!(verify_password("abc123".to_string(), hash.clone()).await);
        assert!(!verify_password("abc124".to_string(), hash).await);
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let a = hash_password("abc123".to_string(), 4).await.unwrap();
        let b = hash_password("abc123".to_string(), 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn garbage_hash_never_verifies() {
        assert!(!verify_password("abc123".to_string(), b"not-a-hash".to_vec()).await);
        assert!(!verify_password("abc123".to_string(), vec![0xff, 0xfe]).await);
    }

    #[tokio::test]
    async fn decoy_is_built_once_at_configured_cost() {
        let decoy = DecoyHash::default();
        decoy.verify("whatever".to_string(), 4).await;
        let first = decoy.hash.get().cloned().unwrap();
        assert!(first.starts_with(b"$2b$04$"));

        decoy.clone().verify("other".to_string(), 4).await;
        assert_eq!(decoy.hash.get(), Some(&first));
    }
}
