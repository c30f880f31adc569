//! Credentials, session tokens and the sealed client/server envelope.

pub mod envelope;
pub mod keys;
pub mod oauth;
pub mod password;
pub mod token;

use thiserror::Error;

pub use keys::{PublicKey, RsaKeyPair};
pub use token::{TokenAlgorithm, TokenIssuer};

/// Claim carrying the account's external id in session tokens
pub const USER_ID_CLAIM: &str = "user_id";

/// Claim carrying a provider-verified email address
pub const EMAIL_CLAIM: &str = "email";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Token has expired")]
    Expired,

    #[error("Token signed with an unexpected algorithm")]
    AlgorithmMismatch,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token is missing claim '{0}'")]
    MissingClaim(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Envelope could not be opened: {0}")]
    Envelope(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::Malformed(err.to_string()),
        }
    }
}
