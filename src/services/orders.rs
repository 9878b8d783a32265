use crate::{
    db::{self, DbPool},
    errors::ServiceError,
    repositories::{OrderLineRow, OrderRepository, OrderWithLines},
    services::{inventory::InventoryService, user_directory::UserDirectory},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /orders`. Fields are optional so that a missing value is
/// reported as invalid input rather than a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderCommand {
    #[schema(example = 1)]
    pub user_id: Option<i32>,
    pub items: Option<Vec<OrderLineRequest>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineRequest {
    #[schema(example = 1)]
    pub item_id: i32,
    #[validate(range(min = 1))]
    #[schema(example = 2, minimum = 1)]
    pub quantity: i32,
}

impl CreateOrderCommand {
    /// Checks shape constraints and returns the user id and lines in request order.
    pub fn into_validated(self) -> Result<(i32, Vec<OrderLineRequest>), ServiceError> {
        let user_id = self
            .user_id
            .ok_or_else(|| ServiceError::InvalidInput("user_id is required".to_string()))?;

        let lines = match self.items {
            Some(lines) if !lines.is_empty() => lines,
            _ => {
                return Err(ServiceError::InvalidInput(
                    "items must contain at least one line".to_string(),
                ))
            }
        };

        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            line.validate().map_err(|_| {
                ServiceError::InvalidInput(format!(
                    "quantity for item {} must be at least 1",
                    line.item_id
                ))
            })?;
            if !seen.insert(line.item_id) {
                return Err(ServiceError::InvalidInput(format!(
                    "item {} appears more than once",
                    line.item_id
                )));
            }
        }

        Ok((user_id, lines))
    }
}

/// A line as it was requested and stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineView {
    pub item_id: i32,
    pub quantity: i32,
}

/// Order as returned right after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlacedOrder {
    pub id: i32,
    pub user_id: i32,
    pub items: Vec<OrderLineView>,
    pub created_at: DateTime<Utc>,
}

/// A stored line joined with the item's current name and price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLineDetail {
    pub item_id: i32,
    pub quantity: i32,
    pub name: Option<String>,
    #[schema(value_type = Option<String>, example = "19.99")]
    pub price: Option<Decimal>,
}

/// Order with joined line details, as served by the read endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineDetail>,
}

impl From<OrderWithLines> for OrderDetail {
    fn from((order, lines): OrderWithLines) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            created_at: order.created_at,
            items: lines.into_iter().map(line_detail).collect(),
        }
    }
}

fn line_detail((line, item): OrderLineRow) -> OrderLineDetail {
    OrderLineDetail {
        item_id: line.item_id,
        quantity: line.quantity,
        name: item.as_ref().map(|i| i.name.clone()),
        price: item.map(|i| i.price),
    }
}

/// Coordinates user verification, stock reservation and order persistence
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    orders: OrderRepository,
    users: Arc<dyn UserDirectory>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            orders: OrderRepository::new(db_pool.clone()),
            db_pool,
            users,
        }
    }

    /// Places an order: all lines are reserved and stored, or nothing is.
    ///
    /// Lines are reserved in request order and the first failing line
    /// decides the error. The user lookup happens before any transaction.
    #[instrument(skip(self, command), fields(user_id = ?command.user_id))]
    pub async fn create_order(
        &self,
        command: CreateOrderCommand,
    ) -> Result<PlacedOrder, ServiceError> {
        let (user_id, lines) = command.into_validated()?;

        if !self.users.user_exists(user_id).await? {
            warn!(user_id, "Rejecting order for unknown user");
            return Err(ServiceError::UserNotFound(user_id));
        }

        let pairs: Vec<(i32, i32)> = lines.iter().map(|l| (l.item_id, l.quantity)).collect();

        let order = db::with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                for &(item_id, quantity) in &pairs {
                    let reservation =
                        InventoryService::reserve_and_decrement(txn, item_id, quantity).await?;
                    debug!(
                        item_id = reservation.item_id,
                        quantity = reservation.quantity,
                        remaining = reservation.remaining,
                        "Line reserved"
                    );
                }

                let order = OrderRepository::insert_order(txn, user_id).await?;
                OrderRepository::insert_lines(txn, order.id, &pairs).await?;
                Ok(order)
            })
        })
        .await
        .map_err(|e| {
            warn!(
                user_id,
                code = e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Order creation rolled back"
            );
            e
        })?;

        info!(
            order_id = order.id,
            user_id,
            lines = lines.len(),
            "Order created successfully"
        );

        Ok(PlacedOrder {
            id: order.id,
            user_id: order.user_id,
            items: lines
                .into_iter()
                .map(|l| OrderLineView {
                    item_id: l.item_id,
                    quantity: l.quantity,
                })
                .collect(),
            created_at: order.created_at,
        })
    }

    /// Gets an order with lines joined against current item data
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderDetail, ServiceError> {
        self.orders
            .find_detail(order_id)
            .await?
            .map(OrderDetail::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Lists all orders, ascending by id
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderDetail>, ServiceError> {
        let orders = self.orders.list_details().await?;
        Ok(orders.into_iter().map(OrderDetail::from).collect())
    }
}
