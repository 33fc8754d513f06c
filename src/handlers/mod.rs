pub mod activity;
pub mod auth;
pub mod common;
pub mod health;
pub mod inventory;
pub mod sell;
pub mod users;
pub mod warehouses;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
