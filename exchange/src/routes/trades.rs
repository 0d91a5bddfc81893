use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Trade, User};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TradeRow {
    id: Uuid,
    buy_order_id: Uuid,
    sell_order_id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    price: Decimal,
    quantity: Decimal,
    created_at: DateTime<Utc>,
}

impl From<Trade> for TradeRow {
    fn from(t: Trade) -> Self {
        Self {
            id: t.id,
            buy_order_id: t.buy_order_id,
            sell_order_id: t.sell_order_id,
            buyer_id: t.buyer_id,
            seller_id: t.seller_id,
            price: t.price,
            quantity: t.quantity,
            created_at: t.created_at,
        }
    }
}

pub fn trade_routes() -> Router<AppState> {
    Router::new().route("/my", get(my_trades))
}

async fn my_trades(State(state): State<AppState>, Extension(user): Extension<User>) -> AppResult<Json<Vec<TradeRow>>> {
    let trades = Trade::list_for_user(&state.pool, user.id).await?;
    Ok(Json(trades.into_iter().map(Into::into).collect()))
}
