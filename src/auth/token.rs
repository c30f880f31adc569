use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::{AuthError, RsaKeyPair};

pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Signing scheme for session tokens. One per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAlgorithm {
    /// Shared `SECRET_KEY`
    HS256,
    /// Server RSA private key
    RS256,
}

impl TokenAlgorithm {
    pub fn jwt_algorithm(self) -> Algorithm {
        match self {
            TokenAlgorithm::HS256 => Algorithm::HS256,
            TokenAlgorithm::RS256 => Algorithm::RS256,
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(TokenAlgorithm::HS256),
            "RS256" => Ok(TokenAlgorithm::RS256),
            other => Err(format!("unsupported token algorithm '{}'", other)),
        }
    }
}

/// Sign `{claim: value, iat, exp}`
pub(crate) fn sign_claim<V: Serialize + ?Sized>(
    algorithm: Algorithm,
    key: &EncodingKey,
    claim: &str,
    value: &V,
    issued_at: DateTime<Utc>,
    lifetime: Duration,
) -> Result<String, AuthError> {
    let value = serde_json::to_value(value).map_err(|e| AuthError::Signing(e.to_string()))?;

    let mut claims = Map::new();
    claims.insert(claim.to_string(), value);
    claims.insert("iat".to_string(), Value::from(issued_at.timestamp()));
    claims.insert("exp".to_string(), Value::from((issued_at + lifetime).timestamp()));

    encode(&Header::new(algorithm), &claims, key).map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verify signature, pinned algorithm and expiry, then extract one claim
pub(crate) fn verify_claim<V: DeserializeOwned>(
    algorithm: Algorithm,
    key: &DecodingKey,
    token: &str,
    claim: &str,
) -> Result<V, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<Map<String, Value>>(token, key, &validation)?;
    let value = data
        .claims
        .get(claim)
        .cloned()
        .ok_or_else(|| AuthError::MissingClaim(claim.to_string()))?;

    serde_json::from_value(value).map_err(|e| AuthError::Malformed(format!("claim '{}': {}", claim, e)))
}

/// Issues and verifies the server's time-boxed single-claim tokens
#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: TokenAlgorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn hmac(secret: &str, lifetime: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidKey("HMAC secret is empty".to_string()));
        }
        Ok(Self {
            algorithm: TokenAlgorithm::HS256,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    pub fn rsa(keys: &RsaKeyPair, lifetime: Duration) -> Self {
        Self {
            algorithm: TokenAlgorithm::RS256,
            encoding: keys.signing_key().clone(),
            decoding: keys.public_key().verifying_key().clone(),
            lifetime,
        }
    }

    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue<V: Serialize + ?Sized>(&self, claim: &str, value: &V) -> Result<String, AuthError> {
        self.issue_at(claim, value, Utc::now())
    }

    pub fn issue_at<V: Serialize + ?Sized>(
        &self,
        claim: &str,
        value: &V,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        sign_claim(
            self.algorithm.jwt_algorithm(),
            &self.encoding,
            claim,
            value,
            issued_at,
            self.lifetime,
        )
    }

    pub fn verify<V: DeserializeOwned>(&self, token: &str, claim: &str) -> Result<V, AuthError> {
        verify_claim(self.algorithm.jwt_algorithm(), &self.decoding, token, claim)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
