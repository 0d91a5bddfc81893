use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Order, OrderKind, OrderStatus, PlaceOrderRequest, Side, User};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderHttpRequest {
    pub side: Side,
    pub order_kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub max_slippage_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub side: Side,
    pub order_kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            side: o.side,
            order_kind: o.order_kind,
            price: o.price,
            quantity: o.quantity,
            remaining_quantity: o.remaining_quantity,
            status: o.status,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    message: &'static str,
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/me", get(my_orders))
        .route("/all", get(all_orders))
        .route("/:id", delete(cancel_order))
}

async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<PlaceOrderHttpRequest>,
) -> AppResult<Json<OrderResponse>> {
    let req = PlaceOrderRequest {
        side: payload.side,
        order_kind: payload.order_kind,
        price: payload.price,
        quantity: payload.quantity,
        max_slippage_price: payload.max_slippage_price,
    };

    let order = Order::place(&state.pool, user.id, req, state.config.fallback_reference_price).await?;

    state
        .matching
        .run_for_order(&state.pool, &state.event_bus, state.config.fallback_reference_price, order.id)
        .await?;

    let order = Order::get(&state.pool, user.id, order.id)
        .await?
        .expect("order just placed must exist");

    Ok(Json(order.into()))
}

async fn my_orders(State(state): State<AppState>, Extension(user): Extension<User>) -> AppResult<Json<Vec<OrderResponse>>> {
    let orders = Order::list_for_user(&state.pool, user.id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

async fn all_orders(State(state): State<AppState>) -> AppResult<Json<Vec<OrderResponse>>> {
    let orders = Order::list_all(&state.pool).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CancelResponse>> {
    Order::cancel(&state.pool, user.id, id).await?;
    state.matching.on_order_canceled(&state.event_bus, id).await;
    Ok(Json(CancelResponse { message: "order cancelled" }))
}
