//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;

/// Creates the API router; protected routes share one auth layer.
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(admin::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(products::routes())
        .merge(orders::public_routes())
        .merge(protected_routes)
}
