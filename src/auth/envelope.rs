//! Sign-then-encrypt envelope for payloads exchanged with clients.
//!
//! The sender signs a single-claim RS256 JWS with its own private key, then
//! wraps that JWS in a compact JWE (`RSA-OAEP-256` key wrap, `A128GCM`
//! content encryption) addressed to the recipient's public key. Opening
//! reverses both steps and checks the signature against the sender's
//! declared public key.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, OsRng, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use rsa::Oaep;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use super::token::{sign_claim, verify_claim, DEFAULT_TOKEN_LIFETIME_HOURS};
use super::{AuthError, PublicKey, RsaKeyPair};

/// Content type of request and response bodies carrying a sealed envelope
pub const MEDIA_TYPE: &str = "application/jose";

const KEY_ALGORITHM: &str = "RSA-OAEP-256";
const CONTENT_ENCRYPTION: &str = "A128GCM";
const CEK_LEN: usize = 16;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
}

/// Sign `{claim: value}` as `sender`, then encrypt to `recipient`
pub fn seal<V: Serialize + ?Sized>(
    claim: &str,
    value: &V,
    sender: &RsaKeyPair,
    recipient: &PublicKey,
) -> Result<String, AuthError> {
    let jws = sign_claim(
        Algorithm::RS256,
        sender.signing_key(),
        claim,
        value,
        Utc::now(),
        Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
    )?;
    encrypt(jws.as_bytes(), recipient)
}

/// Decrypt as `recipient`, then verify the inner signature against `sender`
pub fn open<V: DeserializeOwned>(
    jwe: &str,
    claim: &str,
    recipient: &RsaKeyPair,
    sender: &PublicKey,
) -> Result<V, AuthError> {
    let plaintext = decrypt(jwe, recipient)?;
    let jws = String::from_utf8(plaintext).map_err(|_| AuthError::Envelope("payload is not UTF-8".to_string()))?;
    verify_claim(Algorithm::RS256, sender.verifying_key(), &jws, claim)
}

/// Compact JWE serialization of `plaintext`
pub fn encrypt(plaintext: &[u8], recipient: &PublicKey) -> Result<String, AuthError> {
    let header = ProtectedHeader {
        alg: KEY_ALGORITHM.to_string(),
        enc: CONTENT_ENCRYPTION.to_string(),
        cty: Some("JWT".to_string()),
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
    let protected = URL_SAFE_NO_PAD.encode(header_json);

    let mut cek = [0u8; CEK_LEN];
    OsRng.fill_bytes(&mut cek);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let encrypted_key = recipient
        .key()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)
        .map_err(|e| AuthError::Signing(format!("key wrap failed: {}", e)))?;

    let cipher = Aes128Gcm::new_from_slice(&cek).map_err(|e| AuthError::Signing(e.to_string()))?;
    let mut sealed = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| AuthError::Signing("content encryption failed".to_string()))?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok([
        protected,
        URL_SAFE_NO_PAD.encode(encrypted_key),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(sealed),
        URL_SAFE_NO_PAD.encode(tag),
    ]
    .join("."))
}

/// Inverse of [`encrypt`]; only the pinned algorithms are accepted
pub fn decrypt(jwe: &str, recipient: &RsaKeyPair) -> Result<Vec<u8>, AuthError> {
    let parts: Vec<&str> = jwe.trim().split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(AuthError::Envelope(format!("expected 5 segments, found {}", parts.len())));
    };

    let header: ProtectedHeader = serde_json::from_slice(&segment(protected, "header")?)
        .map_err(|e| AuthError::Envelope(format!("header: {}", e)))?;
    if header.alg != KEY_ALGORITHM || header.enc != CONTENT_ENCRYPTION {
        return Err(AuthError::AlgorithmMismatch);
    }

    let iv = segment(iv, "iv")?;
    let tag = segment(tag, "tag")?;
    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(AuthError::Envelope("bad iv or tag length".to_string()));
    }

    let cek = recipient
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), &segment(encrypted_key, "encrypted key")?)
        .map_err(|_| AuthError::Envelope("key unwrap failed".to_string()))?;
    if cek.len() != CEK_LEN {
        return Err(AuthError::Envelope("bad content key length".to_string()));
    }

    let mut sealed = segment(ciphertext, "ciphertext")?;
    sealed.extend_from_slice(&tag);

    let cipher = Aes128Gcm::new_from_slice(&cek).map_err(|e| AuthError::Envelope(e.to_string()))?;
    cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| AuthError::Envelope("authentication tag mismatch".to_string()))
}

fn segment(value: &str, name: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| AuthError::Envelope(format!("{} is not base64url", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::{client_keys, server_keys};
    use serde_json::json;

    #[test]
    fn client_to_server_recovers_exact_payload() {
        let server = server_keys();
        let client = client_keys();
        let payload = json!({"email": "kim@ex.com", "password": "abc123", "note": "한글 ✓"});

        let jwe = seal("account", &payload, &client, server.public_key()).unwrap();
        assert_eq!(jwe.split('.').count(), 5);

        let opened: serde_json::Value = open(&jwe, "account", &server, client.public_key()).unwrap();
        assert_eq!(
            serde_json::to_vec(&opened).unwrap(),
            serde_json::to_vec(&payload).unwrap()
        );
    }

    #[test]
    fn raw_encryption_round_trips_bytes() {
        let server = server_keys();
        let bytes: Vec<u8> = (0..=255u8).collect();
        let jwe = encrypt(&bytes, server.public_key()).unwrap();
        assert_eq!(decrypt(&jwe, &server).unwrap(), bytes);
    }

    #[test]
    fn only_the_recipient_can_open() {
        let server = server_keys();
        let client = client_keys();
        let jwe = seal("token", "abc", &server, client.public_key()).unwrap();
        assert!(matches!(open::<String>(&jwe, "token", &server, server.public_key()), Err(AuthError::Envelope(_))));
        assert_eq!(open::<String>(&jwe, "token", &client, server.public_key()).unwrap(), "abc");
    }

    #[test]
    fn signature_must_match_declared_sender() {
        let server = server_keys();
        let client = client_keys();
        // signed by the server itself but claimed to come from the client
        let jwe = seal("account", "x", &server, server.public_key()).unwrap();
        assert!(matches!(
            open::<String>(&jwe, "account", &server, client.public_key()),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn tampering_is_detected() {
        let server = server_keys();
        let jwe = encrypt(b"payload", server.public_key()).unwrap();
        let mut parts: Vec<String> = jwe.split('.').map(str::to_string).collect();

        let mut ciphertext = URL_SAFE_NO_PAD.decode(&parts[3]).unwrap();
        ciphertext[0] ^= 0x01;
        parts[3] = URL_SAFE_NO_PAD.encode(ciphertext);
        assert!(matches!(decrypt(&parts.join("."), &server), Err(AuthError::Envelope(_))));

        assert!(decrypt("a.b.c", &server).is_err());
    }

    #[test]
    fn unexpected_header_algorithm_is_refused() {
        let server = server_keys();
        let jwe = encrypt(b"payload", server.public_key()).unwrap();
        let mut parts: Vec<String> = jwe.split('.').map(str::to_string).collect();
        parts[0] = URL_SAFE_NO_PAD.encode(br#"{"alg":"RSA1_5","enc":"A128GCM"}"#);
        assert!(matches!(decrypt(&parts.join("."), &server), Err(AuthError::AlgorithmMismatch)));
    }
}
