use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// The single error type returned by every route handler and service function
/// that touches the ledger or wallet state.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    AuthError(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: rust_decimal::Decimal, required: rust_decimal::Decimal },
    #[error("insufficient asset: available {available}, required {required}")]
    InsufficientAsset { available: rust_decimal::Decimal, required: rust_decimal::Decimal },
    #[error("order cannot be cancelled (status: {0})")]
    NotCancelable(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("transient error, retry: {0}")]
    Transient(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<String>,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("database error: {}", e);
        AppError::Internal(anyhow::anyhow!(e))
    }
}

impl From<crate::models::WalletError> for AppError {
    fn from(e: crate::models::WalletError) -> Self {
        use crate::models::WalletError;
        match e {
            WalletError::InsufficientFunds { available, required } => AppError::InsufficientFunds { available, required },
            WalletError::InsufficientAsset { available, required } => AppError::InsufficientAsset { available, required },
            WalletError::NotFound(id) => AppError::NotFound(format!("wallet for user {id}")),
            WalletError::Database(e) => e.into(),
        }
    }
}

impl From<crate::models::OrderError> for AppError {
    fn from(e: crate::models::OrderError) -> Self {
        use crate::models::OrderError;
        match e {
            OrderError::InsufficientFunds { available, required } => AppError::InsufficientFunds { available, required },
            OrderError::InsufficientAsset { available, required } => AppError::InsufficientAsset { available, required },
            OrderError::LimitOrderRequiresPrice => AppError::ValidationError("limit order requires a positive price".into()),
            OrderError::InvalidQuantity => AppError::ValidationError("quantity must be positive".into()),
            OrderError::NotFound => AppError::NotFound("order".into()),
            OrderError::CannotCancel(status) => AppError::NotCancelable(status),
            OrderError::Database(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            AppError::AuthError(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: format!("{} not found", what), available: None, required: None },
            ),
            AppError::InsufficientFunds { available, required } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "insufficient funds".into(),
                    available: Some(available.to_string()),
                    required: Some(required.to_string()),
                },
            ),
            AppError::InsufficientAsset { available, required } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "insufficient asset".into(),
                    available: Some(available.to_string()),
                    required: Some(required.to_string()),
                },
            ),
            AppError::NotCancelable(status) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: format!("order cannot be cancelled (status: {})", status),
                    available: None,
                    required: None,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            AppError::Transient(msg) => {
                tracing::warn!("transient error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody { error: msg.clone(), available: None, required: None },
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: "internal error".into(), available: None, required: None },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
