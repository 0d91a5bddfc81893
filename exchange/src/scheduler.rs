use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::events::EventBus;
use crate::matching::MatchingService;
use crate::models::Order;
use rust_decimal::Decimal;

/// Spawns a background task that periodically re-runs the matching engine over
/// every still-pending order, to catch liquidity added out of band (e.g. a
/// maker that was skipped pending a retry, or a sweep after a crash recovery).
pub fn spawn_sweeper(
    pool: PgPool,
    matching: Arc<MatchingService>,
    events: EventBus,
    fallback_reference_price: Decimal,
    interval: Duration,
) {
    tokio::spawn(async move {
        tracing::info!("sweeper started, interval {:?}", interval);
        loop {
            tokio::time::sleep(interval).await;

            if let Err(e) = sweep(&pool, &matching, &events, fallback_reference_price).await {
                tracing::error!("sweep failed: {}", e);
            }
        }
    });
}

async fn sweep(
    pool: &PgPool,
    matching: &MatchingService,
    events: &EventBus,
    fallback_reference_price: Decimal,
) -> Result<(), sqlx::Error> {
    let pending = Order::list_pending(pool).await?;
    tracing::debug!("sweeper scanning {} pending orders", pending.len());

    for order in pending {
        if let Err(e) = matching.run_for_order(pool, events, fallback_reference_price, order.id).await {
            tracing::warn!("sweep match attempt failed for order {}: {}", order.id, e);
        }
    }

    Ok(())
}
