//! Cart endpoints for the authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ItemId;
use serde::{Deserialize, Serialize};
use services::CartView;
use store::ShopStore;

use super::{parse_id, quantity, required};
use crate::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub item_id: Option<ItemId>,
    pub quantity: Option<i64>,
}

#[derive(Serialize)]
pub struct CartClearedResponse {
    pub message: &'static str,
    pub cart: CartView,
}

/// GET /cart: the caller's cart with catalog details.
#[tracing::instrument(skip(state))]
pub async fn get<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.view(user_id).await?))
}

/// POST /cart/add: add units of an item.
#[tracing::instrument(skip(state, payload))]
pub async fn add<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CartLineRequest>, JsonRejection>,
) -> Result<Json<CartView>, ApiError> {
    let Json(req) = payload?;
    let item_id = required(req.item_id, "itemId")?;
    let qty = quantity(required(req.quantity, "quantity")?, "quantity", 1)?;

    Ok(Json(state.carts.add(user_id, item_id, qty).await?))
}

/// PUT /cart/update: overwrite a line's quantity; zero or less removes it.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CartLineRequest>, JsonRejection>,
) -> Result<Json<CartView>, ApiError> {
    let Json(req) = payload?;
    let item_id = required(req.item_id, "itemId")?;
    let qty = required(req.quantity, "quantity")?.max(0);
    let qty = quantity(qty, "quantity", 0)?;

    Ok(Json(state.carts.update(user_id, item_id, qty).await?))
}

/// DELETE /cart/remove/{itemId}: drop a line.
#[tracing::instrument(skip(state))]
pub async fn remove<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let item_id: ItemId = parse_id(&item_id, "item")?;
    Ok(Json(state.carts.remove(user_id, item_id).await?))
}

/// DELETE /cart/clear: empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartClearedResponse>, ApiError> {
    let cart = state.carts.clear(user_id).await?;
    Ok(Json(CartClearedResponse {
        message: "Cart cleared successfully",
        cart,
    }))
}
