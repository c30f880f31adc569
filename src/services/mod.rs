pub mod account_service;
pub mod map_store;

pub use account_service::{AccountService, LoginRequest, OAuthLogin, ProfileUpdate, RegisterRequest, Registered};
pub use map_store::{MapError, MapFile, MapStore};
