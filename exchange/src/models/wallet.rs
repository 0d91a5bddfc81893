use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub reserved_balance: Decimal,
    pub holdings: Decimal,
    pub reserved_holdings: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },
    #[error("insufficient asset: available {available}, required {required}")]
    InsufficientAsset { available: Decimal, required: Decimal },
    #[error("wallet not found for user {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Wallet {
    pub async fn create_in_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO wallets (user_id, balance, reserved_balance, holdings, reserved_holdings)
             VALUES ($1, 0, 0, 0, 0) RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn get(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lock the wallet row for the duration of the active transaction.
    pub async fn lock_in_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<Self, WalletError> {
        sqlx::query_as::<_, Self>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(WalletError::NotFound(user_id))
    }

    /// Reserve for a LIMIT BUY: move `price * quantity` from balance to reserved_balance.
    pub async fn reserve_for_buy(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<Self, WalletError> {
        let wallet = Self::lock_in_tx(tx, user_id).await?;
        if wallet.balance < amount {
            return Err(WalletError::InsufficientFunds { available: wallet.balance, required: amount });
        }

        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET balance = balance - $1, reserved_balance = reserved_balance + $1, updated_at = NOW()
             WHERE user_id = $2 RETURNING *",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(WalletError::Database)
    }

    /// Reserve for a SELL: move `quantity` from holdings to reserved_holdings.
    pub async fn reserve_for_sell(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        quantity: Decimal,
    ) -> Result<Self, WalletError> {
        let wallet = Self::lock_in_tx(tx, user_id).await?;
        if wallet.holdings < quantity {
            return Err(WalletError::InsufficientAsset { available: wallet.holdings, required: quantity });
        }

        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET holdings = holdings - $1, reserved_holdings = reserved_holdings + $1, updated_at = NOW()
             WHERE user_id = $2 RETURNING *",
        )
        .bind(quantity)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(WalletError::Database)
    }

    /// Reserve a fixed cash amount for a MARKET BUY whose execution price is not
    /// known at entry time. Same bookkeeping as `reserve_for_buy`, named separately
    /// because the caller-side meaning differs (a budget ceiling, not `price*qty`).
    pub async fn reserve_cash(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        cash_amount: Decimal,
    ) -> Result<Self, WalletError> {
        Self::reserve_for_buy(tx, user_id, cash_amount).await
    }

    /// Release a previously-made reservation, e.g. on cancel of the unfilled remainder.
    pub async fn release_cash(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<Self, WalletError> {
        if amount.is_zero() {
            return Self::lock_in_tx(tx, user_id).await;
        }
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET balance = balance + $1, reserved_balance = GREATEST(reserved_balance - $1, 0), updated_at = NOW()
             WHERE user_id = $2 RETURNING *",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(WalletError::Database)
    }

    pub async fn release_asset(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        quantity: Decimal,
    ) -> Result<Self, WalletError> {
        if quantity.is_zero() {
            return Self::lock_in_tx(tx, user_id).await;
        }
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET holdings = holdings + $1, reserved_holdings = GREATEST(reserved_holdings - $1, 0), updated_at = NOW()
             WHERE user_id = $2 RETURNING *",
        )
        .bind(quantity)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(WalletError::Database)
    }

    /// Free-balance credit/debit, independent of the reservation machinery.
    /// Used by the wallet top-up/withdrawal routes, not by the matching engine.
    pub async fn credit_cash(pool: &PgPool, user_id: Uuid, amount: Decimal) -> Result<Self, WalletError> {
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE user_id = $2 RETURNING *",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WalletError::NotFound(user_id))
    }

    pub async fn debit_cash(pool: &PgPool, user_id: Uuid, amount: Decimal) -> Result<Self, WalletError> {
        let wallet = Self::get(pool, user_id).await?.ok_or(WalletError::NotFound(user_id))?;
        if wallet.balance < amount {
            return Err(WalletError::InsufficientFunds { available: wallet.balance, required: amount });
        }
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET balance = balance - $1, updated_at = NOW() WHERE user_id = $2 RETURNING *",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(WalletError::Database)
    }

    pub async fn credit_asset(pool: &PgPool, user_id: Uuid, quantity: Decimal) -> Result<Self, WalletError> {
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET holdings = holdings + $1, updated_at = NOW() WHERE user_id = $2 RETURNING *",
        )
        .bind(quantity)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WalletError::NotFound(user_id))
    }

    pub async fn debit_asset(pool: &PgPool, user_id: Uuid, quantity: Decimal) -> Result<Self, WalletError> {
        let wallet = Self::get(pool, user_id).await?.ok_or(WalletError::NotFound(user_id))?;
        if wallet.holdings < quantity {
            return Err(WalletError::InsufficientAsset { available: wallet.holdings, required: quantity });
        }
        sqlx::query_as::<_, Self>(
            "UPDATE wallets SET holdings = holdings - $1, updated_at = NOW() WHERE user_id = $2 RETURNING *",
        )
        .bind(quantity)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(WalletError::Database)
    }

    /// Atomic settlement of one fill between a buyer and a seller wallet.
    /// Locks both rows itself, in ascending user-id order, so that two
    /// concurrent matches touching the same pair of users never deadlock.
    pub async fn settle(
        tx: &mut Transaction<'_, Postgres>,
        buyer_id: Uuid,
        seller_id: Uuid,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<(Self, Self), WalletError> {
        let notional = price * quantity;

        let (first_id, second_id) = if buyer_id <= seller_id { (buyer_id, seller_id) } else { (seller_id, buyer_id) };
        let first = Self::lock_in_tx(tx, first_id).await?;
        let second = Self::lock_in_tx(tx, second_id).await?;
        let (buyer, seller) = if first_id == buyer_id { (first, second) } else { (second, first) };

        if buyer.reserved_balance < notional {
            return Err(WalletError::InsufficientFunds { available: buyer.reserved_balance, required: notional });
        }
        if seller.reserved_holdings < quantity {
            return Err(WalletError::InsufficientAsset { available: seller.reserved_holdings, required: quantity });
        }

        let buyer = sqlx::query_as::<_, Self>(
            "UPDATE wallets SET reserved_balance = reserved_balance - $1, holdings = holdings + $2, updated_at = NOW()
             WHERE user_id = $3 RETURNING *",
        )
        .bind(notional)
        .bind(quantity)
        .bind(buyer_id)
        .fetch_one(&mut **tx)
        .await?;

        let seller = sqlx::query_as::<_, Self>(
            "UPDATE wallets SET reserved_holdings = reserved_holdings - $1, balance = balance + $2, updated_at = NOW()
             WHERE user_id = $3 RETURNING *",
        )
        .bind(quantity)
        .bind(notional)
        .bind(seller_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok((buyer, seller))
    }
}
