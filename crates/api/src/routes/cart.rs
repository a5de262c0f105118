//! Shopping cart routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use grocer_db::CartRepository;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the cart routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).post(set_cart_item))
        .route("/cart/{product_id}", delete(remove_cart_item))
}

/// Body for adding or changing a cart line.
#[derive(Debug, Deserialize)]
pub struct SetCartItemRequest {
    /// Product to buy.
    pub product_id: Uuid,
    /// Desired quantity; replaces any existing quantity.
    pub quantity: i32,
    /// Franchise the customer is shopping from.
    pub franchise_id: Option<Uuid>,
}

/// GET /cart - Current cart lines with their products.
async fn get_cart(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = CartRepository::new((*state.db).clone());
    Ok(Json(cart.list(auth.user_id()).await?))
}

/// POST /cart - Set the quantity of one product.
async fn set_cart_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SetCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = CartRepository::new((*state.db).clone());
    let item = cart
        .upsert(
            auth.user_id(),
            payload.product_id,
            payload.quantity,
            payload.franchise_id,
        )
        .await?;

    debug!(user_id = %auth.user_id(), product_id = %item.product_id, quantity = item.quantity, "Cart updated");
    Ok(Json(item))
}

/// DELETE `/cart/{product_id}` - Remove a product from the cart.
async fn remove_cart_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = CartRepository::new((*state.db).clone());
    if cart.remove(auth.user_id(), product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(
            "cart_item_not_found",
            "Product is not in the cart",
        ))
    }
}
