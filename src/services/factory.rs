use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{
        activity::ActivityService, inventory::InventoryService, sales::SalesService,
        users::UserService, warehouses::WarehouseService,
    },
};

/// Factory for creating service instances over a shared pool
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.db_pool.clone())
    }

    pub fn warehouse_service(&self) -> WarehouseService {
        WarehouseService::new(self.db_pool.clone())
    }

    pub fn inventory_service(&self) -> InventoryService {
        InventoryService::new(self.db_pool.clone())
    }

    pub fn sales_service(&self) -> SalesService {
        SalesService::new(self.db_pool.clone())
    }

    pub fn activity_service(&self) -> ActivityService {
        ActivityService::new(self.db_pool.clone())
    }

    /// Gets a reference to the database pool
    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub users: Arc<UserService>,
    pub warehouses: Arc<WarehouseService>,
    pub inventory: Arc<InventoryService>,
    pub sales: Arc<SalesService>,
    pub activity: Arc<ActivityService>,
}

impl ServiceContainer {
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            users: Arc::new(factory.user_service()),
            warehouses: Arc::new(factory.warehouse_service()),
            inventory: Arc::new(factory.inventory_service()),
            sales: Arc::new(factory.sales_service()),
            activity: Arc::new(factory.activity_service()),
        }
    }

    /// Builds every service straight from a pool
    pub fn from_pool(db_pool: Arc<DbPool>) -> Self {
        Self::new(&ServiceFactory::new(db_pool))
    }
}
