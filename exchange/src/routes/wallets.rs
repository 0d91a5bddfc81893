use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{User, Wallet};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    balance: Decimal,
    reserved_balance: Decimal,
    holdings: Decimal,
    reserved_holdings: Decimal,
}

impl From<Wallet> for WalletResponse {
    fn from(w: Wallet) -> Self {
        Self {
            balance: w.balance,
            reserved_balance: w.reserved_balance,
            holdings: w.holdings,
            reserved_holdings: w.reserved_holdings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountPayload {
    amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CashAdjustResponse {
    balance: Decimal,
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssetAdjustResponse {
    holdings: Decimal,
    message: &'static str,
}

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_wallet))
        .route("/topup", post(topup))
        .route("/deduct", post(deduct))
        .route("/add_btc", post(add_btc))
        .route("/withdraw_btc", post(withdraw_btc))
}

async fn get_wallet(State(state): State<AppState>, Extension(user): Extension<User>) -> AppResult<Json<WalletResponse>> {
    let wallet = Wallet::get(&state.pool, user.id).await?.ok_or_else(|| AppError::NotFound("wallet".into()))?;
    Ok(Json(wallet.into()))
}

async fn topup(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<AmountPayload>,
) -> AppResult<Json<CashAdjustResponse>> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::ValidationError("amount must be positive".into()));
    }
    let wallet = Wallet::credit_cash(&state.pool, user.id, payload.amount).await?;
    Ok(Json(CashAdjustResponse { balance: wallet.balance, message: "balance credited" }))
}

async fn deduct(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<AmountPayload>,
) -> AppResult<Json<CashAdjustResponse>> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::ValidationError("amount must be positive".into()));
    }
    let wallet = Wallet::debit_cash(&state.pool, user.id, payload.amount).await?;
    Ok(Json(CashAdjustResponse { balance: wallet.balance, message: "balance debited" }))
}

async fn add_btc(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<AmountPayload>,
) -> AppResult<Json<AssetAdjustResponse>> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::ValidationError("amount must be positive".into()));
    }
    let wallet = Wallet::credit_asset(&state.pool, user.id, payload.amount).await?;
    Ok(Json(AssetAdjustResponse { holdings: wallet.holdings, message: "holdings credited" }))
}

async fn withdraw_btc(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<AmountPayload>,
) -> AppResult<Json<AssetAdjustResponse>> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::ValidationError("amount must be positive".into()));
    }
    let wallet = Wallet::debit_asset(&state.pool, user.id, payload.amount).await?;
    Ok(Json(AssetAdjustResponse { holdings: wallet.holdings, message: "holdings debited" }))
}
