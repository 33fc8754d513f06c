// Audit trail
pub mod activity;

// Accounts and warehouses
pub mod users;
pub mod warehouses;

// Stock
pub mod inventory;
pub mod sales;

// Service container for dependency injection
pub mod factory;

pub use factory::{ServiceContainer, ServiceFactory};
