//! Order endpoints: checkout, history, cancellation and operator controls.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ItemId, OrderId};
use domain::{Order, OrderStatus, PaymentMethod, ShippingAddress};
use serde::{Deserialize, Serialize};
use services::Checkout;
use store::ShopStore;

use super::{MessageResponse, parse_id, quantity, required};
use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentUser, Operator};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
}

impl TryFrom<CheckoutRequest> for Checkout {
    type Error = ApiError;

    fn try_from(req: CheckoutRequest) -> Result<Self, Self::Error> {
        let address = required(req.address, "address")?;
        let payment_method = PaymentMethod::new(required(req.payment_method, "paymentMethod")?)?;
        Ok(Checkout {
            address,
            payment_method,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleItemOrderRequest {
    pub item_id: Option<ItemId>,
    pub quantity: Option<i64>,
    #[serde(flatten)]
    pub checkout: CheckoutRequest,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AdminListParams {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub message: &'static str,
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrderMessageResponse {
    pub message: &'static str,
    pub order: Order,
}

// -- Handlers --

/// POST /orders: check out the caller's cart.
#[tracing::instrument(skip(state, payload))]
pub async fn create_from_cart<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(req) = payload?;
    let order = state
        .orders
        .create_from_cart(user_id, req.try_into()?)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /orders/single-item: order one item directly.
#[tracing::instrument(skip(state, payload))]
pub async fn create_single_item<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<SingleItemOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let Json(req) = payload?;
    let item_id = required(req.item_id, "itemId")?;
    let qty = quantity(required(req.quantity, "quantity")?, "quantity", 1)?;
    let checkout = req.checkout.try_into()?;

    let order = state
        .orders
        .create_single_item(user_id, item_id, qty, checkout)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            message: "Order created successfully",
            order,
        }),
    ))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_for_user(user_id).await?))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_for_user(user_id, order_id).await?))
}

/// PUT /orders/{id}/cancel: cancel and restock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderMessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.cancel(user_id, order_id).await?;
    Ok(Json(OrderMessageResponse {
        message: "Order cancelled successfully",
        order,
    }))
}

/// DELETE /orders/{id}: hide an order from its owner.
#[tracing::instrument(skip(state))]
pub async fn delete<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    state.orders.soft_delete(user_id, order_id).await?;
    Ok(Json(MessageResponse {
        message: "Order deleted successfully",
    }))
}

/// GET /orders/admin/all: every visible order, optionally by status.
#[tracing::instrument(skip(state, params))]
pub async fn admin_list<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Operator(_): Operator,
    params: Result<Query<AdminListParams>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Query(params) = params?;
    let status = params
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OrderStatus>())
        .transpose()?;

    Ok(Json(state.orders.admin_list(status).await?))
}

/// PUT /orders/admin/{id}/status: force any status.
#[tracing::instrument(skip(state, payload))]
pub async fn admin_set_status<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Operator(operator): Operator,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<OrderMessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let Json(req) = payload?;
    let status: OrderStatus = required(req.status, "status")?.parse()?;

    let order = state.orders.admin_set_status(order_id, status).await?;
    tracing::info!(%operator, order_number = %order.order_number(), %status, "status set by operator");

    Ok(Json(OrderMessageResponse {
        message: "Order status updated",
        order,
    }))
}
