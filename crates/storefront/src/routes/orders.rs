//! Order routes.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use carlot_core::{Order, OrderRequest};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::routes::extract_json;
use crate::services::OrderService;
use crate::state::AppState;

/// Response for a created order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub message: &'static str,
    pub order: Order,
}

/// Response for an order listing.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

/// Create an order for the caller.
///
/// POST /order/create
///
/// # Errors
///
/// Returns 400 for an invalid request or a duplicate submission.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    body: std::result::Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let request = extract_json(body)?;

    let order = OrderService::new(state.orders(), state.users())
        .create_order(&identity, request)
        .await?;

    add_breadcrumb(
        "order",
        "Order created",
        Some(&[("item_id", order.item_id.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            message: "Order created successfully",
            order,
        }),
    ))
}

/// Every order, newest first. Admin only.
///
/// GET /order/list
///
/// # Errors
///
/// Returns 500 if the order store fails.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<OrderListResponse>> {
    let orders = OrderService::new(state.orders(), state.users())
        .list_all()
        .await?;

    Ok(Json(OrderListResponse {
        success: true,
        orders,
    }))
}

/// The caller's own orders, newest first.
///
/// GET /order/mine
///
/// # Errors
///
/// Returns 500 if the order store fails.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<OrderListResponse>> {
    let orders = OrderService::new(state.orders(), state.users())
        .list_for(&identity)
        .await?;

    Ok(Json(OrderListResponse {
        success: true,
        orders,
    }))
}
