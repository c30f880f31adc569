// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints. Login and registration accept sealed bodies
// and sit behind the client-key middleware; the OAuth pair does not.

pub mod login;    // POST /auth/login
pub mod oauth;    // GET /auth/oauth, GET /auth/oauthsuccess
pub mod register; // POST|PUT /auth/register

pub use login::login_post;
pub use oauth::{oauth_get, oauth_success_get};
pub use register::register_post;
