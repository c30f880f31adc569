pub mod manager;
pub mod models;
pub mod repositories;
pub mod schema;

pub use manager::{DatabaseError, DatabaseManager};
