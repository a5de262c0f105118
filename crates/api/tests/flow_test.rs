//! End-to-end API flows against a real database.
//!
//! Each test returns early when no database is reachable.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use grocer_core::auth::hash_password;
use grocer_db::entities::{categories, products, users};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::{Value, json};
use uuid::Uuid;

macro_rules! db_or_skip {
    () => {
        match common::connect().await {
            Some(db) => db,
            None => return,
        }
    };
}

async fn seed_product(db: &DatabaseConnection, stock_qty: i32) -> products::Model {
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Pantry {}", Uuid::new_v4())),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    products::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(format!("API-{}", Uuid::new_v4().simple())),
        item_name: Set("Basmati Rice".to_string()),
        category_id: Set(category.id),
        retail_price: Set(dec!(4.50)),
        stock_qty: Set(stock_qty),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn register(app: &axum::Router, email: &str) -> Value {
    let (status, body) = common::send(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": email, "password": "correct horse", "name": "Robin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn token(body: &Value, key: &str) -> String {
    body[key].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_checkout_then_cancel_restores_stock() {
    let db = db_or_skip!();
    let app = common::app(common::state(db.clone(), false));
    let product = seed_product(&db, 10).await;

    let session = register(&app, &format!("robin-{}@example.com", Uuid::new_v4())).await;
    let access = token(&session, "access_token");

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/cart",
        Some(&access),
        Some(json!({ "product_id": product.id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, order) = common::send(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&access),
        Some(json!({ "delivery_address": "4 Orchard Row" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], "12.75");
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    let order_id = order["id"].as_str().unwrap().to_string();

    let stock = |db: DatabaseConnection, id: Uuid| async move {
        products::Entity::find_by_id(id)
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .stock_qty
    };
    assert_eq!(stock(db.clone(), product.id).await, 8);

    let (status, body) = common::send(
        &app,
        "PUT",
        &format!("/api/v1/orders/{order_id}/status"),
        Some(&access),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, cancelled) = common::send(
        &app,
        "PUT",
        &format!("/api/v1/orders/{order_id}/status"),
        Some(&access),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(stock(db.clone(), product.id).await, 10);

    let (status, listing) = common::send(&app, "GET", "/api/v1/orders", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["meta"]["total"], 1);

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/orders",
        Some(&access),
        Some(json!({ "delivery_address": "4 Orchard Row" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_cart");
}

#[tokio::test]
async fn test_refresh_token_rotation_rejects_replay() {
    let db = db_or_skip!();
    let app = common::app(common::state(db, false));
    let email = format!("rotate-{}@example.com", Uuid::new_v4());
    let session = register(&app, &email).await;
    let first = token(&session, "refresh_token");

    let (status, rotated) = common::send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(token(&rotated, "refresh_token"), first);

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_refresh_token");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email.to_uppercase(), "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_blocked_account_is_refused() {
    let db = db_or_skip!();
    let app = common::app(common::state(db.clone(), false));
    let email = format!("blocked-{}@example.com", Uuid::new_v4());
    let session = register(&app, &email).await;
    let access = token(&session, "access_token");

    let user_id = Uuid::parse_str(session["user"]["id"].as_str().unwrap()).unwrap();
    let user = users::Entity::find_by_id(user_id).one(&db).await.unwrap().unwrap();
    let mut active: users::ActiveModel = user.into();
    active.is_blocked = Set(true);
    active.update(&db).await.unwrap();

    let (status, body) = common::send(&app, "GET", "/api/v1/cart", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account_blocked");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account_blocked");
}

#[tokio::test]
async fn test_admin_batch_import_runs_to_completion() {
    let db = db_or_skip!();
    let app = common::app(common::state(db.clone(), true));
    let category = seed_product(&db, 1).await.category_id;

    let admin_email = format!("admin-{}@example.com", Uuid::new_v4());
    users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(admin_email.clone()),
        password_hash: Set(hash_password("admin password").unwrap()),
        name: Set("Admin".to_string()),
        role: Set("admin".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let (status, login) = common::send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": admin_email, "password": "admin password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin = token(&login, "access_token");

    let customer = register(&app, &format!("nosy-{}@example.com", Uuid::new_v4())).await;
    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/admin/products/batch",
        Some(&token(&customer, "access_token")),
        Some(json!({ "products": [{ "item_name": "Nope" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, accepted) = common::send(
        &app,
        "POST",
        "/api/v1/admin/products/batch",
        Some(&admin),
        Some(json!({
            "products": [
                { "item_name": format!("Chickpeas {}", Uuid::new_v4()), "category_id": category, "retail_price": "1.35" },
                { "item_name": "Missing Price", "category_id": category },
                { "item_name": "Typo Stock", "category_id": category, "retail_price": "2", "stock_qty": "ten" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["status"], "processing");
    assert_eq!(accepted["total"], 3);
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let mut snapshot = Value::Null;
    for _ in 0..100 {
        let (status, body) = common::send(
            &app,
            "GET",
            &format!("/api/v1/admin/products/batch/{job_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "completed" || body["status"] == "failed" {
            snapshot = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(snapshot["status"], "completed", "{snapshot}");
    assert_eq!(snapshot["created"], 1);
    assert_eq!(snapshot["failed"], 2);
    assert!(
        snapshot["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["product"] == "Typo Stock" && e["fields"].as_str().unwrap().starts_with("invalid_row"))
    );
    assert_eq!(snapshot["progress"], 100);

    let (status, body) = common::send(
        &app,
        "GET",
        &format!("/api/v1/admin/products/batch/{}", Uuid::new_v4()),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "job_not_found");
}
