use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use exchange::config::Config;
use exchange::db;
use exchange::events::EventBus;
use exchange::matching::MatchingService;
use exchange::models::token::TokenService;
use exchange::models::User;
use exchange::routes::{auth_routes, order_routes, trade_routes, wallet_routes};
use exchange::scheduler;
use exchange::ws::ws_handler;
use exchange::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exchange=debug".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = Config::from_env();

    tracing::info!("connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("running migrations...");
    db::run_migrations(&pool).await?;

    let matching = Arc::new(MatchingService::new());
    tracing::info!("rebuilding order book from ledger...");
    matching.rebuild_from_ledger(&pool).await?;

    let event_bus = EventBus::new();

    scheduler::spawn_sweeper(
        pool.clone(),
        matching.clone(),
        event_bus.clone(),
        config.fallback_reference_price,
        Duration::from_secs(config.sweeper_interval_secs),
    );

    let bind_addr = config.bind_addr.clone();
    let cors_origins = config.cors_allowed_origins.clone();
    let state = AppState { pool, config: Arc::new(config), event_bus, matching };

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/auth", auth_routes())
        .nest(
            "/wallets",
            wallet_routes().layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/orders",
            order_routes().layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .nest(
            "/trades",
            trade_routes().layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .layer(cors_layer(cors_origins.as_deref()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("exchange service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use axum::http::Method;

    let allowed_headers = [AUTHORIZATION, CONTENT_TYPE, ACCEPT];
    let allowed_methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];

    match allowed_origins {
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            CorsLayer::new().allow_origin(allowed).allow_methods(allowed_methods).allow_headers(allowed_headers)
        }
        None => {
            let dev_origins: Vec<HeaderValue> = ["http://localhost:5173", "http://localhost:3000"]
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(dev_origins).allow_methods(allowed_methods).allow_headers(allowed_headers)
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "missing authorization header".into() })))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid authorization header".into() })))?;

    let claims = TokenService::verify_access_token(token, &state.config.secret_key)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid or expired token".into() })))?;

    let user_id: uuid::Uuid = claims
        .sub
        .parse()
        .map_err(|_| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "invalid token".into() })))?;

    let user = User::find_by_id(&state.pool, user_id)
        .await
        .map_err(|e| {
            tracing::error!("failed to find user: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: "internal error".into() }))
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse { error: "user not found".into() })))?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
