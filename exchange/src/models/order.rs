use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl From<Side> for matching_engine::Side {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => matching_engine::Side::Bid,
            Side::Sell => matching_engine::Side::Ask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Market,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Market => write!(f, "market"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Executed,
    Canceled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Executed => write!(f, "executed"),
            OrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub side: Side,
    pub order_kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub status: OrderStatus,
    /// Fiat or asset amount locked at placement; used to compute the residual
    /// release on cancel independent of any price drift since entry.
    pub reserved_amount: Decimal,
    /// Strictly increasing insertion sequence, used to break ties at equal price.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub side: Side,
    pub order_kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    /// Market-buy only: maximum price the caller is willing to pay, used to size
    /// the cash reservation when the true execution price isn't known yet.
    pub max_slippage_price: Option<Decimal>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },
    #[error("insufficient asset: available {available}, required {required}")]
    InsufficientAsset { available: Decimal, required: Decimal },
    #[error("limit order requires a positive price")]
    LimitOrderRequiresPrice,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("order not found")]
    NotFound,
    #[error("order cannot be cancelled (status: {0})")]
    CannotCancel(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<super::wallet::WalletError> for OrderError {
    fn from(e: super::wallet::WalletError) -> Self {
        match e {
            super::wallet::WalletError::InsufficientFunds { available, required } => {
                OrderError::InsufficientFunds { available, required }
            }
            super::wallet::WalletError::InsufficientAsset { available, required } => {
                OrderError::InsufficientAsset { available, required }
            }
            super::wallet::WalletError::NotFound(_) => OrderError::NotFound,
            super::wallet::WalletError::Database(e) => OrderError::Database(e),
        }
    }
}

impl Order {
    /// Amount to reserve at placement time, per §4.2 / §4.5: `price*qty` for LIMIT BUY,
    /// `qty` for SELL (either kind), or a caller-supplied / fallback cash ceiling for MARKET BUY.
    pub fn reservation_amount(req: &PlaceOrderRequest, fallback_reference_price: Decimal) -> Decimal {
        match (req.side, req.order_kind) {
            (Side::Buy, OrderKind::Limit) => req.price.unwrap_or_default() * req.quantity,
            (Side::Buy, OrderKind::Market) => {
                let reference = req.max_slippage_price.unwrap_or(fallback_reference_price);
                reference * req.quantity
            }
            (Side::Sell, _) => req.quantity,
        }
    }

    pub async fn place(
        pool: &PgPool,
        user_id: Uuid,
        req: PlaceOrderRequest,
        fallback_reference_price: Decimal,
    ) -> Result<Order, OrderError> {
        if req.quantity <= Decimal::ZERO {
            return Err(OrderError::InvalidQuantity);
        }
        if req.order_kind == OrderKind::Limit {
            match req.price {
                Some(p) if p > Decimal::ZERO => {}
                _ => return Err(OrderError::LimitOrderRequiresPrice),
            }
        }

        let reserved_amount = Self::reservation_amount(&req, fallback_reference_price);

        let mut tx = pool.begin().await?;

        match req.side {
            Side::Buy => {
                super::wallet::Wallet::reserve_for_buy(&mut tx, user_id, reserved_amount).await?;
            }
            Side::Sell => {
                super::wallet::Wallet::reserve_for_sell(&mut tx, user_id, req.quantity).await?;
            }
        }

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (id, user_id, side, order_kind, price, quantity, remaining_quantity, status, reserved_amount, sequence)
             VALUES ($1, $2, $3, $4, $5, $6, $6, 'pending', $7, nextval('orders_sequence_seq'))
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.side)
        .bind(req.order_kind)
        .bind(req.price)
        .bind(req.quantity)
        .bind(reserved_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }

    pub async fn cancel(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> Result<Order, OrderError> {
        let mut tx = pool.begin().await?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.status != OrderStatus::Pending {
            return Err(OrderError::CannotCancel(order.status.to_string()));
        }

        let filled_ratio = if order.quantity.is_zero() {
            Decimal::ZERO
        } else {
            (order.quantity - order.remaining_quantity) / order.quantity
        };
        let residual = order.reserved_amount * (Decimal::ONE - filled_ratio);

        match order.side {
            Side::Buy => {
                super::wallet::Wallet::release_cash(&mut tx, user_id, residual).await?;
            }
            Side::Sell => {
                super::wallet::Wallet::release_asset(&mut tx, user_id, residual).await?;
            }
        }

        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = 'canceled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_id(pool: &PgPool, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// All pending orders in priority-neutral (sequence) order, for book rebuild
    /// on process start and for the periodic sweeper.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE status = 'pending' ORDER BY sequence ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn lock_in_tx(tx: &mut Transaction<'_, Postgres>, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// The single best opposite PENDING order for `side`, locked for update, skipping
    /// rows already locked by a concurrent matcher and rows owned by `exclude_user`
    /// (self-trade candidates, which the caller advances past instead of matching).
    pub async fn best_opposite_pending_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        side: Side,
        exclude_order_ids: &[Uuid],
    ) -> Result<Option<Order>, sqlx::Error> {
        let order_by = match side {
            Side::Buy => "price DESC, sequence ASC",
            Side::Sell => "price ASC, sequence ASC",
        };
        let query = format!(
            "SELECT * FROM orders WHERE status = 'pending' AND side = $1 AND NOT (id = ANY($2))
             ORDER BY {order_by} LIMIT 1 FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(side)
            .bind(exclude_order_ids)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn apply_fill_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        fill_quantity: Decimal,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "UPDATE orders SET
                remaining_quantity = remaining_quantity - $1,
                status = CASE WHEN remaining_quantity - $1 <= 0 THEN 'executed' ELSE status END,
                updated_at = NOW()
             WHERE id = $2
             RETURNING *",
        )
        .bind(fill_quantity)
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await
    }
}
