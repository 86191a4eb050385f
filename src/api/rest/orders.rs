use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::validate::CoordinatePair;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order).patch(take_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub origin: CoordinatePair,
    pub destination: CoordinatePair,
}

#[derive(Deserialize)]
pub struct TakeOrderRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct TakeOrderResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_order_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(format!("invalid order id: {raw}"))),
    }
}

fn parse_positive(raw: Option<&str>, name: &str) -> Result<i64, AppError> {
    raw.and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .ok_or_else(|| AppError::BadRequest(format!("{name} must be an integer >= 1")))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(payload) =
        payload.map_err(|err| AppError::BadRequest(format!("invalid input: {}", err.body_text())))?;

    let order = state
        .orders
        .create_order(&payload.origin, &payload.destination)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let id = parse_order_id(&id)?;
    let order = state.orders.get_order(id).await?;
    Ok(Json(order))
}

async fn take_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TakeOrderRequest>, JsonRejection>,
) -> Result<Json<TakeOrderResponse>, AppError> {
    let id = parse_order_id(&id)?;
    let Json(payload) =
        payload.map_err(|err| AppError::BadRequest(format!("invalid input: {}", err.body_text())))?;

    if payload.status != OrderStatus::Taken.as_str() {
        return Err(AppError::BadRequest(format!(
            "unsupported status {}, only {} is allowed",
            payload.status,
            OrderStatus::Taken
        )));
    }

    state.orders.claim_order(id).await?;
    Ok(Json(TakeOrderResponse { status: "SUCCESS" }))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let page = parse_positive(query.page.as_deref(), "page")?;
    let limit = parse_positive(query.limit.as_deref(), "limit")?;

    let orders = state.orders.list_orders(page, limit).await?;
    Ok(Json(orders))
}
