pub mod common;
pub mod health;
pub mod items;
pub mod orders;

use crate::db::DbPool;
use crate::services::{
    inventory::InventoryService, orders::OrderService, user_directory::UserDirectory,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone(), users)),
            inventory: Arc::new(InventoryService::new(db_pool)),
        }
    }
}
