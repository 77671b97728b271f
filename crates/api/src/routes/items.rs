//! Catalog endpoints. Reads are public; writes need the operator role.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ItemId;
use domain::{CatalogItem, ItemDetails, Money};
use serde::Deserialize;
use store::ShopStore;

use super::{MessageResponse, parse_id, quantity, required};
use crate::AppState;
use crate::error::ApiError;
use crate::extractors::Operator;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub item_no: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<i64>,
    pub category: Option<String>,
    pub reorder_level: Option<i64>,
}

impl TryFrom<ItemRequest> for ItemDetails {
    type Error = ApiError;

    fn try_from(req: ItemRequest) -> Result<Self, Self::Error> {
        Ok(ItemDetails {
            item_no: required(req.item_no, "itemNo")?,
            name: required(req.name, "name")?,
            description: req.description.filter(|d| !d.trim().is_empty()),
            quantity: quantity(required(req.quantity, "quantity")?, "quantity", 0)?,
            unit_price: Money::from_cents(required(req.unit_price, "unitPrice")?),
            category: required(req.category, "category")?,
            reorder_level: quantity(required(req.reorder_level, "reorderLevel")?, "reorderLevel", 1)?,
        })
    }
}

/// POST /items: add an item to the catalog.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Operator(_): Operator,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CatalogItem>), ApiError> {
    let Json(req) = payload?;
    let item = state.catalog.create(req.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /items: list the catalog.
pub async fn list<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CatalogItem>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// GET /items/alerts: items below their reorder level.
pub async fn alerts<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CatalogItem>>, ApiError> {
    Ok(Json(state.catalog.low_stock().await?))
}

/// GET /items/{id}: fetch one item.
pub async fn get<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CatalogItem>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    Ok(Json(state.catalog.get(item_id).await?))
}

/// PUT /items/{id}: replace an item's attributes.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Operator(_): Operator,
    Path(id): Path<String>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<Json<CatalogItem>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let Json(req) = payload?;
    let item = state.catalog.update(item_id, req.try_into()?).await?;
    Ok(Json(item))
}

/// DELETE /items/{id}: remove an item.
#[tracing::instrument(skip(state))]
pub async fn delete<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Operator(_): Operator,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    state.catalog.delete(item_id).await?;
    Ok(Json(MessageResponse {
        message: "Item deleted successfully",
    }))
}
