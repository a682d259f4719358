//! Order creation, duplicate rejection, and listings through the full router.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Value, json};

use carlot_integration_tests::{ADMIN_EMAIL, TestContext};

fn roadster(date: &str) -> Value {
    json!({
        "carId": "car-42",
        "carName": "Roadster",
        "quantity": 2,
        "price": 15000,
        "totalPrice": 30000,
        "orderDate": date,
        "deliveryAddress": "1 Speedway Blvd",
        "phone": "+1 555 0100"
    })
}

#[tokio::test]
async fn buyer_orders_once_and_admin_sees_it() {
    let (ctx, store) = TestContext::in_memory(false);
    ctx.register("Lot Admin", ADMIN_EMAIL, "admin-password").await;
    let buyer = ctx
        .register("Ada Lovelace", "ada@example.com", "analytical-engine")
        .await;

    let created = ctx
        .send("POST", "/order/create", Some(&buyer), Some(roadster("2024-01-01")))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.message(), Some("Order created successfully"));
    let order = &created.body["order"];
    assert_eq!(order["customer_name"], "Ada Lovelace");
    assert_eq!(order["customer_email"], "ada@example.com");
    assert_eq!(order["status"], "Processing");
    assert_eq!(order["payment_method"], "Card");
    assert_eq!(order["total_price"], "30000");

    let duplicate = ctx
        .send("POST", "/order/create", Some(&buyer), Some(roadster("2024-01-01")))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        duplicate.message(),
        Some("Order already exists for this car, quantity, price, and order date combination")
    );
    assert_eq!(store.order_count(), 1);

    let admin = ctx
        .send(
            "POST",
            "/user/adminpanellogin",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "admin-password" })),
        )
        .await;
    let admin = admin.token().expect("admin token").to_owned();

    let listing = ctx.send("GET", "/order/list", Some(&admin), None).await;
    assert_eq!(listing.status, StatusCode::OK);
    let orders = listing.body["orders"].as_array().expect("orders array");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().map(|o| &o["id"]), Some(&order["id"]));
}

#[tokio::test]
async fn duplicate_key_is_global_across_buyers() {
    let (ctx, store) = TestContext::in_memory(false);
    let ada = ctx
        .register("Ada", "ada@example.com", "analytical-engine")
        .await;
    let bob = ctx.register("Bob", "bob@example.com", "bobs-password").await;

    let first = ctx
        .send("POST", "/order/create", Some(&ada), Some(roadster("2024-03-05")))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = ctx
        .send("POST", "/order/create", Some(&bob), Some(roadster("2024-03-05")))
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(store.order_count(), 1);

    // Any change to the key makes it a different purchase.
    let other_day = ctx
        .send("POST", "/order/create", Some(&bob), Some(roadster("2024-03-06")))
        .await;
    assert_eq!(other_day.status, StatusCode::CREATED);
    assert_eq!(store.order_count(), 2);
}

#[tokio::test]
async fn concurrent_identical_submissions_store_one_order() {
    let (ctx, store) = TestContext::in_memory(false);
    let buyer = ctx
        .register("Ada", "ada@example.com", "analytical-engine")
        .await;
    let ctx = Arc::new(ctx);

    let mut handles = Vec::new();
    for _ in 0..12 {
        let ctx = Arc::clone(&ctx);
        let buyer = buyer.clone();
        handles.push(tokio::spawn(async move {
            ctx.send("POST", "/order/create", Some(&buyer), Some(roadster("2024-06-01")))
                .await
                .status
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn rejected_submissions_store_nothing() {
    let (ctx, store) = TestContext::in_memory(false);
    let buyer = ctx
        .register("Ada", "ada@example.com", "analytical-engine")
        .await;

    let mut wrong_total = roadster("2024-01-01");
    wrong_total["totalPrice"] = json!(29000);
    let mut zero_quantity = roadster("2024-01-01");
    zero_quantity["quantity"] = json!(0);
    let mut blank_car = roadster("2024-01-01");
    blank_car["carId"] = json!("  ");
    let mut extreme_total = roadster("2024-01-01");
    extreme_total["totalPrice"] = json!("-79228162514264337593543950335");

    for body in [
        wrong_total,
        zero_quantity,
        blank_car,
        extreme_total,
        json!({ "carId": "car-42" }),
    ] {
        let response = ctx
            .send("POST", "/order/create", Some(&buyer), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{:?}", response.body);
        assert_eq!(response.body["success"], false);
    }

    let unauthenticated = ctx
        .send("POST", "/order/create", None, Some(roadster("2024-01-01")))
        .await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);

    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn token_for_deleted_user_cannot_order() {
    let (ctx, store) = TestContext::in_memory(false);
    let ghost = ctx.token_for("no-such-user");

    let response = ctx
        .send("POST", "/order/create", Some(&ghost), Some(roadster("2024-01-01")))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), Some("Customer not found"));
    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn mine_lists_only_the_callers_orders() {
    let (ctx, _) = TestContext::in_memory(false);
    let ada = ctx
        .register("Ada", "ada@example.com", "analytical-engine")
        .await;
    let bob = ctx.register("Bob", "bob@example.com", "bobs-password").await;

    ctx.send("POST", "/order/create", Some(&ada), Some(roadster("2024-01-01")))
        .await;
    ctx.send("POST", "/order/create", Some(&ada), Some(roadster("2024-01-02")))
        .await;
    ctx.send("POST", "/order/create", Some(&bob), Some(roadster("2024-01-03")))
        .await;

    let mine = ctx.send("GET", "/order/mine", Some(&ada), None).await;
    assert_eq!(mine.status, StatusCode::OK);
    let orders = mine.body["orders"].as_array().expect("orders array");
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["customer_email"] == "ada@example.com"));

    let forbidden = ctx.send("GET", "/order/list", Some(&bob), None).await;
    assert_eq!(forbidden.status, StatusCode::BAD_REQUEST);
    assert_eq!(forbidden.message(), Some("Not authorized as an admin"));
}
