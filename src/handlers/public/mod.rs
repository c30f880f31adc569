// handlers/public/mod.rs - Public handlers (no session token required)
//
// Security Level: None, or a client public key for the credential endpoints
// Routes: /health, /publickey, /auth/*

pub mod auth;
pub mod health;
pub mod publickey;

pub use health::health_get;
pub use publickey::publickey_get;
