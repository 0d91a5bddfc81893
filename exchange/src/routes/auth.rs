use axum::{extract::State, routing::post, Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::token::TokenService;
use crate::models::{RefreshToken, User, UserError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    id: String,
    username: String,
    email: String,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self { id: u.id.to_string(), username: u.username, email: u.email }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

async fn issue_tokens(state: &AppState, user: &User) -> AppResult<(String, String)> {
    let access_token = TokenService::create_access_token(
        user.id,
        &user.username,
        &state.config.secret_key,
        state.config.access_token_expire_minutes,
    );
    let (_, refresh_token) = RefreshToken::create(
        &state.pool,
        user.id,
        &state.config.secret_key,
        state.config.refresh_token_expire_days,
    )
    .await?;
    Ok((access_token, refresh_token))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<Json<UserSummary>> {
    if !payload.email.contains('@') {
        return Err(AppError::ValidationError("invalid email".into()));
    }
    if payload.username.trim().is_empty() {
        return Err(AppError::ValidationError("username must not be empty".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::ValidationError("password must be at least 8 characters".into()));
    }

    let user = User::register(&state.pool, payload.username.trim(), payload.email.trim(), &payload.password)
        .await
        .map_err(|e| match e {
            UserError::AlreadyExists => AppError::Conflict("username or email already taken".into()),
            other => AppError::Internal(other.into()),
        })?;

    Ok(Json(user.into()))
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Json<TokenResponse>> {
    let user = User::find_by_username(&state.pool, form.username.trim()).await?;
    let user = user
        .filter(|u| u.verify_password(&form.password))
        .ok_or_else(|| AppError::AuthError("invalid username or password".into()))?;

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    Ok(Json(TokenResponse { access_token, refresh_token, token_type: "bearer" }))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> AppResult<Json<RefreshResponse>> {
    TokenService::verify_refresh_token(&payload.refresh_token, &state.config.secret_key)
        .ok_or_else(|| AppError::AuthError("invalid refresh token".into()))?;

    let token_record = RefreshToken::find_valid(&state.pool, &payload.refresh_token)
        .await?
        .ok_or_else(|| AppError::AuthError("session expired or revoked".into()))?;

    let user = User::find_by_id(&state.pool, token_record.user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("user not found".into()))?;

    RefreshToken::revoke(&state.pool, token_record.id).await?;

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    Ok(Json(RefreshResponse { access_token, refresh_token, token_type: "bearer" }))
}
