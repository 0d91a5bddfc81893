pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod matching;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod ws;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use events::EventBus;
use matching::MatchingService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub event_bus: EventBus,
    pub matching: Arc<MatchingService>,
}
