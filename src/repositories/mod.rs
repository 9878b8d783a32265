use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod item_repository;
pub mod order_repository;

pub use item_repository::ItemRepository;
pub use order_repository::{OrderLineRow, OrderRepository, OrderWithLines};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
