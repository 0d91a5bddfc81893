use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Append a trade inside the settlement transaction. Trades are immutable
    /// once written, so there is no update path here, only insert.
    pub async fn record_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        buy_order_id: Uuid,
        sell_order_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Trade, sqlx::Error> {
        sqlx::query_as::<_, Trade>(
            "INSERT INTO trades (id, buy_order_id, sell_order_id, buyer_id, seller_id, price, quantity)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(buy_order_id)
        .bind(sell_order_id)
        .bind(buyer_id)
        .bind(seller_id)
        .bind(price)
        .bind(quantity)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Trade>, sqlx::Error> {
        sqlx::query_as::<_, Trade>(
            "SELECT * FROM trades WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
