//! Shopping cart repository.

use chrono::Utc;
use grocer_core::catalog::ProductStatus;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Statement,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{cart_items, products};

const UPSERT_SQL: &str = r"
INSERT INTO cart_items (id, user_id, product_id, franchise_id, quantity, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, now(), now())
ON CONFLICT (user_id, product_id) WHERE deleted_at IS NULL
DO UPDATE SET quantity = EXCLUDED.quantity,
              franchise_id = EXCLUDED.franchise_id,
              updated_at = now()
RETURNING *
";

/// Cart errors.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity below one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Product missing, deleted, or inactive.
    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// A cart row with its product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: cart_items::Model,
    pub product: products::Model,
}

/// Cart repository.
#[derive(Debug, Clone)]
pub struct CartRepository {
    db: DatabaseConnection,
}

impl CartRepository {
    /// Creates a new cart repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the user's live cart rows, oldest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CartLine>, CartError> {
        let rows = cart_items::Entity::find()
            .filter(cart_items::Column::UserId.eq(user_id))
            .filter(cart_items::Column::DeletedAt.is_null())
            .order_by_asc(cart_items::Column::CreatedAt)
            .find_also_related(products::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|product| CartLine { item, product }))
            .collect())
    }

    /// Sets the quantity of a product in the cart, adding the row if needed.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        franchise_id: Option<Uuid>,
    ) -> Result<cart_items::Model, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        products::Entity::find_by_id(product_id)
            .filter(products::Column::DeletedAt.is_null())
            .filter(products::Column::Status.eq(ProductStatus::Active.as_str()))
            .one(&self.db)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            UPSERT_SQL,
            [
                Uuid::new_v4().into(),
                user_id.into(),
                product_id.into(),
                franchise_id.into(),
                quantity.into(),
            ],
        );
        cart_items::Entity::find()
            .from_raw_sql(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| CartError::Database(DbErr::RecordNotInserted))
    }

    /// Removes a product from the cart. Returns false if it was not there.
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, CartError> {
        let result = cart_items::Entity::update_many()
            .col_expr(cart_items::Column::DeletedAt, Expr::value(Utc::now()))
            .filter(cart_items::Column::UserId.eq(user_id))
            .filter(cart_items::Column::ProductId.eq(product_id))
            .filter(cart_items::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
