//! Order placement and lifecycle routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use grocer_core::order::{GeoPoint, OrderStatus, transition_map};
use grocer_db::repositories::{OrderWithItems, PlaceOrderInput};
use grocer_db::{OrderRepository, UserRepository};
use grocer_shared::{OrderEmail, PageRequest};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the authenticated order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{order_id}", get(get_order))
        .route("/orders/{order_id}/status", put(update_order_status))
}

/// Creates the public order routes.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/order-transitions", get(order_transitions))
}

// ============================================================================
// Request Types
// ============================================================================

/// Checkout request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Where to deliver; required.
    #[serde(default)]
    pub delivery_address: String,
    /// Payment method label.
    pub payment_method: Option<String>,
    /// Franchise chosen by the customer.
    pub franchise_id: Option<Uuid>,
    /// Customer latitude for nearest-franchise routing.
    pub customer_lat: Option<f64>,
    /// Customer longitude for nearest-franchise routing.
    pub customer_lng: Option<f64>,
}

impl CreateOrderRequest {
    fn into_input(self) -> Result<PlaceOrderInput, ApiError> {
        let customer_geo = match (self.customer_lat, self.customer_lng) {
            (Some(lat), Some(lng)) => {
                let point = GeoPoint::new(lat, lng);
                if !point.is_valid() {
                    return Err(invalid_location());
                }
                Some(point)
            }
            (None, None) => None,
            _ => return Err(invalid_location()),
        };

        Ok(PlaceOrderInput {
            delivery_address: self.delivery_address,
            payment_method: self.payment_method,
            franchise_id: self.franchise_id,
            customer_geo,
        })
    }
}

/// Query parameters for listing orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Admin-only franchise filter.
    pub franchise_id: Option<Uuid>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub per_page: Option<u32>,
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status name.
    pub status: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /orders - Check out the caller's cart.
async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let orders = OrderRepository::new((*state.db).clone(), state.delivery);
    let order = orders.place_order(auth.user_id(), input).await?;

    info!(
        order_id = %order.order.id,
        order_number = %order.order.order_number,
        user_id = %auth.user_id(),
        franchise_id = ?order.order.franchise_id,
        total = %order.order.total,
        "Order placed"
    );
    notify(&state, &order, Notification::Confirmation);

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders - Orders visible to the caller, newest first.
async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let scope = auth.actor().list_scope(query.franchise_id);

    let orders = OrderRepository::new((*state.db).clone(), state.delivery);
    Ok(Json(orders.list_orders(scope, page).await?))
}

/// GET `/orders/{order_id}` - One order with its items.
async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = OrderRepository::new((*state.db).clone(), state.delivery);
    Ok(Json(orders.get_order(order_id, &auth.actor()).await?))
}

/// PUT `/orders/{order_id}/status` - Move an order through its lifecycle.
async fn update_order_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target: OrderStatus = payload.status.parse().map_err(|_| {
        ApiError::bad_request(
            "invalid_status",
            format!("Unknown order status: {}", payload.status),
        )
    })?;

    let orders = OrderRepository::new((*state.db).clone(), state.delivery);
    let change = orders
        .update_status(order_id, target, &auth.actor())
        .await?;

    info!(
        order_id = %order_id,
        from = %change.previous,
        to = %target,
        actor = %auth.user_id(),
        "Order status changed"
    );
    notify(&state, &change.order, Notification::StatusUpdate);

    Ok(Json(change.order))
}

/// GET /order-transitions - Allowed next statuses for every status.
async fn order_transitions() -> impl IntoResponse {
    Json(transition_map())
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Notification {
    Confirmation,
    StatusUpdate,
}

/// Emails the customer on a background task; failures are only logged.
fn notify(state: &AppState, order: &OrderWithItems, kind: Notification) {
    let db = (*state.db).clone();
    let email_service = state.email_service.clone();
    let order = order.clone();

    tokio::spawn(async move {
        let user = match UserRepository::new(db).find_by_id(order.order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(order_id = %order.order.id, "Order owner not found; skipping email");
                return;
            }
            Err(e) => {
                error!(order_id = %order.order.id, error = %e, "Failed to load order owner");
                return;
            }
        };

        let email = order_email(&order, user.email, user.name);
        let sent = match kind {
            Notification::Confirmation => email_service.send_order_confirmation(&email).await,
            Notification::StatusUpdate => email_service.send_order_status_update(&email).await,
        };
        if let Err(e) = sent {
            error!(order_id = %order.order.id, error = %e, ?kind, "Failed to send order email");
        }
    });
}

fn order_email(order: &OrderWithItems, to_email: String, to_name: String) -> OrderEmail {
    OrderEmail {
        to_email,
        to_name,
        order_number: order.order.order_number.clone(),
        status: order.order.status.clone(),
        lines: order
            .items
            .iter()
            .map(|item| (item.item_name.clone(), item.quantity, item.price))
            .collect(),
        subtotal: order.order.subtotal,
        delivery_fee: order.order.delivery_fee,
        total: order.order.total,
        points_earned: order.order.points_earned,
    }
}

fn invalid_location() -> ApiError {
    ApiError::bad_request(
        "invalid_location",
        "customer_lat and customer_lng must be given together as valid coordinates",
    )
}
