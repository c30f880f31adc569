pub mod account;
pub mod auth;
pub mod json;
pub mod payload;
pub mod response;

pub use account::CurrentAccount;
pub use auth::{client_key_middleware, jwt_auth_middleware, AuthUser, ClientKey, CLIENT_KEY_HEADER};
pub use json::Json;
pub use payload::Payload;
pub use response::{ApiResponse, ApiResult};
