use crate::{
    entities::item,
    errors::ServiceError,
    repositories::ItemRepository,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// Public view of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemView {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
}

impl From<item::Model> for ItemView {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            quantity: model.quantity,
            price: model.price,
        }
    }
}

/// Outcome of a successful reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub item_id: i32,
    pub quantity: i32,
    /// Stock left on the item once the enclosing transaction commits
    pub remaining: i32,
}

/// Service owning item stock
#[derive(Clone)]
pub struct InventoryService {
    items: ItemRepository,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            items: ItemRepository::new(db_pool),
        }
    }

    /// Looks up a single item
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i32) -> Result<ItemView, ServiceError> {
        self.items
            .find_by_id(item_id)
            .await?
            .map(ItemView::from)
            .ok_or(ServiceError::ItemNotFound(item_id))
    }

    /// Locks the item row, checks stock and decrements it inside `txn`.
    ///
    /// The row lock (where the backend has one) is held until `txn` ends, so
    /// concurrent reservations of the same item are serialized. Nothing is
    /// undone here on failure: rolling back `txn` restores the quantity.
    #[instrument(skip(txn))]
    pub async fn reserve_and_decrement(
        txn: &DatabaseTransaction,
        item_id: i32,
        quantity: i32,
    ) -> Result<Reservation, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::InvalidInput(format!(
                "quantity for item {} must be at least 1",
                item_id
            )));
        }

        let locked = ItemRepository::lock_for_update(txn, item_id)
            .await?
            .ok_or(ServiceError::ItemNotFound(item_id))?;

        if locked.quantity < quantity {
            debug!(
                item_id,
                requested = quantity,
                available = locked.quantity,
                "Not enough stock"
            );
            return Err(ServiceError::InsufficientStock {
                item_id,
                requested: quantity,
                available: locked.quantity,
            });
        }

        if !ItemRepository::decrement_if_available(txn, item_id, quantity).await? {
            // Stock moved between the read and the guarded update
            let available = ItemRepository::lock_for_update(txn, item_id)
                .await?
                .map(|item| item.quantity)
                .ok_or(ServiceError::ItemNotFound(item_id))?;
            warn!(
                item_id,
                requested = quantity,
                available,
                "Guarded decrement did not apply"
            );
            return Err(ServiceError::InsufficientStock {
                item_id,
                requested: quantity,
                available,
            });
        }

        Ok(Reservation {
            item_id,
            quantity,
            remaining: locked.quantity - quantity,
        })
    }
}
