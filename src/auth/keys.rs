use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;

use super::AuthError;

pub const DEFAULT_KEY_BITS: usize = 2048;

/// The server's RSA identity: signs tokens, opens envelopes, and is served
/// (public half only) from `/publickey`.
#[derive(Clone)]
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
    signing: EncodingKey,
}

impl RsaKeyPair {
    /// Accepts PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) PEM
    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let signing = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_key(RsaPublicKey::from(&private))?;

        Ok(Self {
            private,
            public,
            signing,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path)
            .map_err(|e| AuthError::InvalidKey(format!("{}: {}", path.display(), e)))?;
        Self::from_pem(&pem)
    }

    pub fn generate(bits: usize) -> Result<Self, AuthError> {
        let private = RsaPrivateKey::new(&mut aes_gcm::aead::OsRng, bits)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Self::from_pem(&pem)
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn private_pem(&self) -> Result<String, AuthError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))
    }

    pub fn signing_key(&self) -> &EncodingKey {
        &self.signing
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// An RSA public key plus its SPKI PEM form
#[derive(Clone)]
pub struct PublicKey {
    key: RsaPublicKey,
    pem: String,
    verifying: DecodingKey,
}

impl PublicKey {
    fn from_key(key: RsaPublicKey) -> Result<Self, AuthError> {
        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let verifying = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self { key, pem, verifying })
    }

    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        let key = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Self::from_key(key)
    }

    /// Decode a `Client-Public-Key` header: base64 of a PEM document
    pub fn from_header_value(value: &str) -> Result<Self, AuthError> {
        let bytes = STANDARD
            .decode(value.trim())
            .map_err(|e| AuthError::InvalidKey(format!("not base64: {}", e)))?;
        let pem = String::from_utf8(bytes).map_err(|_| AuthError::InvalidKey("not UTF-8 PEM".to_string()))?;
        Self::from_pem(&pem)
    }

    pub fn to_header_value(&self) -> String {
        STANDARD.encode(self.pem.as_bytes())
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn key(&self) -> &RsaPublicKey {
        &self.key
    }

    pub fn verifying_key(&self) -> &DecodingKey {
        &self.verifying
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("pem", &self.pem).finish()
    }
}
