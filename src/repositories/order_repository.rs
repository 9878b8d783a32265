use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entities::item::{Entity as Item, Model as ItemModel};
use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel,
};
use crate::entities::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItem, Model as OrderItemModel,
};
use crate::repositories::Repository;

use super::BaseRepository;

/// A stored line joined with the item it references, as it is now.
pub type OrderLineRow = (OrderItemModel, Option<ItemModel>);

/// An order together with its lines in request order.
pub type OrderWithLines = (OrderModel, Vec<OrderLineRow>);

/// Repository for order operations
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Inserts the order row and returns it with its assigned id
    pub async fn insert_order<C>(conn: &C, user_id: i32) -> Result<OrderModel, DbErr>
    where
        C: ConnectionTrait,
    {
        OrderActiveModel {
            user_id: Set(user_id),
            ..Default::default()
        }
        .insert(conn)
        .await
    }

    /// Inserts all lines of an order, recording each line's position
    pub async fn insert_lines<C>(conn: &C, order_id: i32, lines: &[(i32, i32)]) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        if lines.is_empty() {
            return Ok(());
        }

        let models = lines
            .iter()
            .enumerate()
            .map(|(position, &(item_id, quantity))| OrderItemActiveModel {
                order_id: Set(order_id),
                item_id: Set(item_id),
                quantity: Set(quantity),
                position: Set(position as i32),
            });

        OrderItem::insert_many(models)
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    /// Finds an order and its lines joined against current item data
    pub async fn find_detail(&self, id: i32) -> Result<Option<OrderWithLines>, DbErr> {
        let db = self.base.get_db();

        let Some(order) = Order::find_by_id(id).one(db).await? else {
            return Ok(None);
        };

        let lines = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(id))
            .find_also_related(Item)
            .order_by_asc(order_item::Column::Position)
            .all(db)
            .await?;

        Ok(Some((order, lines)))
    }

    /// Lists every order, ascending by id, each with its joined lines
    pub async fn list_details(&self) -> Result<Vec<OrderWithLines>, DbErr> {
        let db = self.base.get_db();

        let orders = Order::find().order_by_asc(Column::Id).all(db).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let rows = OrderItem::find()
            .find_also_related(Item)
            .order_by_asc(order_item::Column::OrderId)
            .order_by_asc(order_item::Column::Position)
            .all(db)
            .await?;

        let mut lines_by_order: BTreeMap<i32, Vec<OrderLineRow>> = BTreeMap::new();
        for row in rows {
            lines_by_order.entry(row.0.order_id).or_default().push(row);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                (order, lines)
            })
            .collect())
    }
}
