//! Order repository: checkout transaction, status changes, and listing.
//!
//! Checkout locks every stock row it touches with `SELECT ... FOR UPDATE`,
//! always in ascending product id order so concurrent checkouts cannot
//! deadlock on each other.

use std::collections::HashMap;

use chrono::Utc;
use grocer_core::order::{
    DeliveryPolicy, GeoPoint, OrderActor, OrderError, OrderScope, OrderStatus, PriceOverride,
    StockSource, compute_totals, effective_price, generate_order_number, select_nearest_franchise,
};
use grocer_shared::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{load_images, product_content};
use super::franchise::{FranchiseRepository, delivery_policy};
use crate::entities::{
    cart_items, franchise_products, franchises, order_items, orders, products, users,
};

/// Order-number insert attempts before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Checkout request.
#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    /// Free-form delivery address; required.
    pub delivery_address: String,
    /// Payment method label; defaults to `cash_on_delivery`.
    pub payment_method: Option<String>,
    /// Explicit franchise; wins over `customer_geo`.
    pub franchise_id: Option<Uuid>,
    /// Customer location for nearest-franchise routing.
    pub customer_geo: Option<GeoPoint>,
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: orders::Model,
    pub items: Vec<order_items::Model>,
}

impl OrderWithItems {
    /// Parsed status of the order.
    #[must_use]
    pub fn status(&self) -> Option<OrderStatus> {
        self.order.status.parse().ok()
    }
}

/// Result of a status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Status before the change.
    pub previous: OrderStatus,
    /// Order after the change.
    pub order: OrderWithItems,
}

/// A priced cart line, frozen at checkout.
#[derive(Debug, Clone)]
struct CheckoutLine {
    product_id: Uuid,
    item_name: String,
    image_url: Option<String>,
    quantity: i32,
    price: Decimal,
}

/// Order repository.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: DatabaseConnection,
    franchises: FranchiseRepository,
    delivery: DeliveryPolicy,
}

impl OrderRepository {
    /// Creates a new order repository with the global delivery terms.
    #[must_use]
    pub fn new(db: DatabaseConnection, delivery: DeliveryPolicy) -> Self {
        Self {
            franchises: FranchiseRepository::new(db.clone()),
            db,
            delivery,
        }
    }

    /// Places an order from the user's cart.
    ///
    /// Stock reservation, order insert, loyalty credit, and cart clearance
    /// commit together or not at all.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderWithItems, OrderError> {
        let delivery_address = input.delivery_address.trim().to_string();
        if delivery_address.is_empty() {
            return Err(OrderError::Validation(
                "delivery_address is required".to_string(),
            ));
        }
        if input.customer_geo.is_some_and(|geo| !geo.is_valid()) {
            return Err(OrderError::Validation(
                "customer location is out of range".to_string(),
            ));
        }

        let franchise = self
            .resolve_franchise(input.franchise_id, input.customer_geo)
            .await?;
        let franchise_id = franchise.as_ref().map(|f| f.id);
        let policy = franchise.as_ref().map_or(self.delivery, delivery_policy);

        let txn = self.db.begin().await.map_err(db_error)?;

        // Serializes checkouts of the same cart; the loser sees it empty.
        users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| OrderError::Validation(format!("user {user_id} not found")))?;

        let mut lines = price_cart(&txn, user_id, franchise_id).await?;
        let totals = compute_totals(
            &lines
                .iter()
                .map(|line| (line.price, line.quantity))
                .collect::<Vec<_>>(),
            &policy,
        );

        lines.sort_by_key(|line| line.product_id);

        let mut sources = Vec::with_capacity(lines.len());
        for line in &lines {
            sources.push(reserve_stock(&txn, franchise_id, line).await?);
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let draft = orders::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            franchise_id: Set(franchise_id),
            order_number: Set(String::new()),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            subtotal: Set(totals.subtotal),
            delivery_fee: Set(totals.delivery_fee),
            total: Set(totals.total),
            delivery_address: Set(delivery_address),
            payment_method: Set(input
                .payment_method
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "cash_on_delivery".to_string())),
            points_earned: Set(totals.points_earned),
            customer_lat: Set(input.customer_geo.map(|g| g.lat)),
            customer_lng: Set(input.customer_geo.map(|g| g.lng)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };
        let order = insert_with_unique_number(&txn, draft).await?;

        let items: Vec<order_items::ActiveModel> = lines
            .iter()
            .zip(&sources)
            .map(|(line, source)| order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                item_name: Set(line.item_name.clone()),
                image_url: Set(line.image_url.clone()),
                quantity: Set(line.quantity),
                price: Set(line.price),
                stock_source: Set(Some(source.as_str().to_string())),
                created_at: Set(now.into()),
            })
            .collect();
        order_items::Entity::insert_many(items)
            .exec(&txn)
            .await
            .map_err(db_error)?;

        users::Entity::update_many()
            .col_expr(
                users::Column::LoyaltyPoints,
                Expr::col(users::Column::LoyaltyPoints).add(totals.points_earned),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        cart_items::Entity::update_many()
            .col_expr(cart_items::Column::DeletedAt, Expr::value(now))
            .filter(cart_items::Column::UserId.eq(user_id))
            .filter(cart_items::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .map_err(db_error)?;

        txn.commit().await.map_err(db_error)?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            %user_id,
            franchise_id = ?franchise_id,
            total = %order.total,
            "order placed"
        );

        self.load_with_items(order.id)
            .await?
            .ok_or(OrderError::NotFound(order.id))
    }

    async fn resolve_franchise(
        &self,
        franchise_id: Option<Uuid>,
        customer_geo: Option<GeoPoint>,
    ) -> Result<Option<franchises::Model>, OrderError> {
        if let Some(id) = franchise_id {
            return self
                .franchises
                .find_active(id)
                .await
                .map_err(db_error)?
                .map(Some)
                .ok_or(OrderError::FranchiseNotFound(id));
        }

        let Some(geo) = customer_geo else {
            return Ok(None);
        };

        let active = self.franchises.list_active().await.map_err(db_error)?;
        let locations: Vec<_> = active.iter().map(super::franchise::location).collect();
        let (nearest, distance_km) = select_nearest_franchise(geo, &locations)
            .ok_or(OrderError::NoFranchiseServesLocation)?;
        debug!(franchise_id = %nearest.id, distance_km, "franchise resolved by location");

        Ok(active.into_iter().find(|f| f.id == nearest.id))
    }

    /// Moves an order to `target`, restoring stock on cancellation.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        actor: &OrderActor,
    ) -> Result<StatusChange, OrderError> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let order = orders::Entity::find_by_id(order_id)
            .filter(orders::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or(OrderError::NotFound(order_id))?;

        if !actor.can_view(order.user_id, order.franchise_id) {
            return Err(OrderError::NotFound(order_id));
        }

        let current: OrderStatus = order.status.parse().map_err(OrderError::Database)?;
        if !actor.can_set_status(order.user_id, order.franchise_id, current, target) {
            return Err(OrderError::Forbidden);
        }
        if !current.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let now = Utc::now();
        orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(target.as_str()))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        if target == OrderStatus::Cancelled {
            let mut items = order_items::Entity::find()
                .filter(order_items::Column::OrderId.eq(order.id))
                .all(&txn)
                .await
                .map_err(db_error)?;
            items.sort_by_key(|item| item.product_id);
            for item in &items {
                restore_stock(&txn, order.franchise_id, item).await?;
            }
            debug!(order_id = %order.id, items = items.len(), "stock restored");
        }

        txn.commit().await.map_err(db_error)?;
        info!(order_id = %order.id, from = %current, to = %target, "order status changed");

        let order = self
            .load_with_items(order.id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        Ok(StatusChange {
            previous: current,
            order,
        })
    }

    /// Lists orders visible under `scope`, newest first.
    pub async fn list_orders(
        &self,
        scope: OrderScope,
        page: PageRequest,
    ) -> Result<PageResponse<OrderWithItems>, OrderError> {
        let page = page.normalized();
        let mut query = orders::Entity::find().filter(orders::Column::DeletedAt.is_null());
        match scope {
            OrderScope::All { franchise_id } => {
                if let Some(franchise_id) = franchise_id {
                    query = query.filter(orders::Column::FranchiseId.eq(franchise_id));
                }
            }
            OrderScope::Customer(user_id) => {
                query = query.filter(orders::Column::UserId.eq(user_id));
            }
            OrderScope::Franchise(franchise_id) => {
                query = query.filter(orders::Column::FranchiseId.eq(franchise_id));
            }
            OrderScope::Nothing => {
                return Ok(PageResponse::new(Vec::new(), page.page, page.per_page, 0));
            }
        }

        let total = query.clone().count(&self.db).await.map_err(db_error)?;
        let orders = query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut items = self
            .items_for(&orders.iter().map(|o| o.id).collect::<Vec<_>>())
            .await?;
        let data = orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect();

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Fetches one order if the caller may see it.
    pub async fn get_order(
        &self,
        order_id: Uuid,
        actor: &OrderActor,
    ) -> Result<OrderWithItems, OrderError> {
        let order = self
            .load_with_items(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        if actor.can_view(order.order.user_id, order.order.franchise_id) {
            Ok(order)
        } else {
            Err(OrderError::NotFound(order_id))
        }
    }

    async fn load_with_items(&self, order_id: Uuid) -> Result<Option<OrderWithItems>, OrderError> {
        let Some(order) = orders::Entity::find_by_id(order_id)
            .filter(orders::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };
        let items = self
            .items_for(&[order.id])
            .await?
            .remove(&order.id)
            .unwrap_or_default();
        Ok(Some(OrderWithItems { order, items }))
    }

    async fn items_for(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<order_items::Model>>, OrderError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = order_items::Entity::find()
            .filter(order_items::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_items::Column::CreatedAt)
            .order_by_asc(order_items::Column::ProductId)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        let mut grouped: HashMap<Uuid, Vec<order_items::Model>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

/// Loads the cart with products and freezes name, image, and price.
async fn price_cart(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    franchise_id: Option<Uuid>,
) -> Result<Vec<CheckoutLine>, OrderError> {
    let cart = cart_items::Entity::find()
        .filter(cart_items::Column::UserId.eq(user_id))
        .filter(cart_items::Column::DeletedAt.is_null())
        .find_also_related(products::Entity)
        .all(txn)
        .await
        .map_err(db_error)?;
    if cart.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut entries = Vec::with_capacity(cart.len());
    for (item, product) in cart {
        match product.filter(|p| p.deleted_at.is_none()) {
            Some(product) => entries.push((item, product)),
            None => {
                return Err(OrderError::Validation(format!(
                    "product {} is no longer available",
                    item.product_id
                )));
            }
        }
    }

    let product_ids: Vec<Uuid> = entries.iter().map(|(_, p)| p.id).collect();
    let mut images = load_images(txn, &product_ids)
        .await
        .map_err(db_error)?;

    let overrides: HashMap<Uuid, PriceOverride> = match franchise_id {
        Some(franchise) => franchise_products::Entity::find()
            .filter(franchise_products::Column::FranchiseId.eq(franchise))
            .filter(franchise_products::Column::ProductId.is_in(product_ids.iter().copied()))
            .all(txn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|row| {
                (
                    row.product_id,
                    PriceOverride {
                        retail: row.retail_price_override,
                        promotion: row.promotion_price_override,
                    },
                )
            })
            .collect(),
        None => HashMap::new(),
    };

    let today = Utc::now().date_naive();
    Ok(entries
        .into_iter()
        .map(|(item, product)| {
            let pricing = product_content(&product).pricing();
            CheckoutLine {
                product_id: product.id,
                image_url: images
                    .remove(&product.id)
                    .and_then(|list| list.into_iter().next())
                    .map(|image| image.image_url),
                price: effective_price(&pricing, overrides.get(&product.id), today),
                item_name: product.item_name,
                quantity: item.quantity,
            }
        })
        .collect())
}

/// Locks and decrements the franchise row, or the master product when the
/// franchise does not stock it.
async fn reserve_stock(
    txn: &DatabaseTransaction,
    franchise_id: Option<Uuid>,
    line: &CheckoutLine,
) -> Result<StockSource, OrderError> {
    let now = Utc::now();

    if let Some(franchise_id) = franchise_id {
        let row = franchise_products::Entity::find()
            .filter(franchise_products::Column::FranchiseId.eq(franchise_id))
            .filter(franchise_products::Column::ProductId.eq(line.product_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_error)?;

        if let Some(row) = row {
            if row.stock_qty < line.quantity {
                return Err(OrderError::InsufficientStock {
                    item_name: line.item_name.clone(),
                });
            }
            franchise_products::Entity::update_many()
                .col_expr(
                    franchise_products::Column::StockQty,
                    Expr::col(franchise_products::Column::StockQty).sub(line.quantity),
                )
                .col_expr(franchise_products::Column::UpdatedAt, Expr::value(now))
                .filter(franchise_products::Column::Id.eq(row.id))
                .exec(txn)
                .await
                .map_err(db_error)?;
            return Ok(StockSource::Franchise);
        }
    }

    let product = products::Entity::find_by_id(line.product_id)
        .filter(products::Column::DeletedAt.is_null())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            OrderError::Validation(format!("product {} is no longer available", line.product_id))
        })?;

    if product.stock_qty < line.quantity {
        return Err(OrderError::InsufficientStock {
            item_name: line.item_name.clone(),
        });
    }
    products::Entity::update_many()
        .col_expr(
            products::Column::StockQty,
            Expr::col(products::Column::StockQty).sub(line.quantity),
        )
        .col_expr(products::Column::UpdatedAt, Expr::value(now))
        .filter(products::Column::Id.eq(product.id))
        .exec(txn)
        .await
        .map_err(db_error)?;
    Ok(StockSource::Master)
}

/// Returns an item's quantity to the row it was reserved from.
async fn restore_stock(
    txn: &DatabaseTransaction,
    franchise_id: Option<Uuid>,
    item: &order_items::Model,
) -> Result<(), OrderError> {
    let recorded = item
        .stock_source
        .as_deref()
        .and_then(|s| s.parse::<StockSource>().ok());
    let now = Utc::now();

    if let (Some(franchise_id), Some(StockSource::Franchise) | None) = (franchise_id, recorded) {
        let restored = franchise_products::Entity::update_many()
            .col_expr(
                franchise_products::Column::StockQty,
                Expr::col(franchise_products::Column::StockQty).add(item.quantity),
            )
            .col_expr(franchise_products::Column::UpdatedAt, Expr::value(now))
            .filter(franchise_products::Column::FranchiseId.eq(franchise_id))
            .filter(franchise_products::Column::ProductId.eq(item.product_id))
            .exec(txn)
            .await
            .map_err(db_error)?;
        if restored.rows_affected > 0 {
            return Ok(());
        }
        if recorded.is_some() {
            warn!(
                order_item_id = %item.id,
                product_id = %item.product_id,
                "franchise stock row gone, restoring to master"
            );
        }
    }

    products::Entity::update_many()
        .col_expr(
            products::Column::StockQty,
            Expr::col(products::Column::StockQty).add(item.quantity),
        )
        .col_expr(products::Column::UpdatedAt, Expr::value(now))
        .filter(products::Column::Id.eq(item.product_id))
        .exec(txn)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Inserts the order, retrying with a fresh number on collision.
async fn insert_with_unique_number(
    txn: &DatabaseTransaction,
    draft: orders::ActiveModel,
) -> Result<orders::Model, OrderError> {
    let today = Utc::now().date_naive();

    for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
        let mut candidate = draft.clone();
        candidate.order_number = Set(generate_order_number(today));

        let savepoint = txn.begin().await.map_err(db_error)?;
        match candidate.insert(&savepoint).await {
            Ok(order) => {
                savepoint.commit().await.map_err(db_error)?;
                return Ok(order);
            }
            Err(e) if is_unique_violation(&e) => {
                savepoint.rollback().await.map_err(db_error)?;
                warn!(attempt, "order number collision, retrying");
            }
            Err(e) => return Err(db_error(e)),
        }
    }

    Err(OrderError::OrderNumberExhausted)
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn db_error(e: DbErr) -> OrderError {
    OrderError::Database(e.to_string())
}
