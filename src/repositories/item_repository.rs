use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect,
};
use std::sync::Arc;

use crate::entities::item::{Column, Entity as Item, Model as ItemModel};
use crate::repositories::Repository;

use super::BaseRepository;

/// Repository for item rows
#[derive(Debug, Clone)]
pub struct ItemRepository {
    base: BaseRepository,
}

impl ItemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find an item by ID outside of any transaction
    pub async fn find_by_id(&self, id: i32) -> Result<Option<ItemModel>, DbErr> {
        Item::find_by_id(id).one(self.base.get_db()).await
    }

    /// Reads the item with an exclusive row lock held until `conn` ends.
    ///
    /// Emits `SELECT ... FOR UPDATE` on Postgres and MySQL; SQLite has no row
    /// locks and relies on its single-writer serialization instead.
    pub async fn lock_for_update<C>(conn: &C, id: i32) -> Result<Option<ItemModel>, DbErr>
    where
        C: ConnectionTrait,
    {
        Item::find_by_id(id).lock_exclusive().one(conn).await
    }

    /// Decrements `quantity` by `by` only if enough stock remains.
    ///
    /// Returns `false` when the guard did not match, leaving the row untouched.
    pub async fn decrement_if_available<C>(conn: &C, id: i32, by: i32) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = Item::update_many()
            .col_expr(Column::Quantity, Expr::col(Column::Quantity).sub(by))
            .filter(Column::Id.eq(id))
            .filter(Column::Quantity.gte(by))
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
