use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::events::{EventBus, LevelSnapshot, MarketEvent};
use crate::models::{Order, OrderError, OrderKind, OrderStatus, Side, Wallet};

const BOOK_DEPTH: usize = 20;

/// In-memory cache of resting liquidity, used only to render top-of-book
/// snapshots for `BookUpdate` events. The ledger of orders in Postgres is the
/// source of truth; this cache is rebuilt from it on startup and kept in sync
/// incrementally as orders rest, fill, or cancel.
pub struct MatchingService {
    book: Mutex<matching_engine::OrderBook>,
}

impl MatchingService {
    pub fn new() -> Self {
        Self { book: Mutex::new(matching_engine::OrderBook::new()) }
    }

    /// Replay every currently-pending order into a fresh book, in placement order,
    /// so that resting quantity and price-time priority match the ledger exactly.
    pub async fn rebuild_from_ledger(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let pending = Order::list_pending(pool).await?;
        let mut book = self.book.lock().await;
        *book = matching_engine::OrderBook::new();
        for order in pending {
            if order.order_kind != OrderKind::Limit {
                // Market orders never rest; a pending market order only exists
                // for the instant between insert and its first match attempt.
                continue;
            }
            let Some(price) = order.price else { continue };
            book.add_limit_order(order.id, order.user_id, order.side.into(), price, order.remaining_quantity);
        }
        Ok(())
    }

    async fn book_snapshot(&self) -> (Vec<LevelSnapshot>, Vec<LevelSnapshot>) {
        let book = self.book.lock().await;
        let bids = book.top_levels(matching_engine::Side::Bid, BOOK_DEPTH).into_iter().map(Into::into).collect();
        let asks = book.top_levels(matching_engine::Side::Ask, BOOK_DEPTH).into_iter().map(Into::into).collect();
        (bids, asks)
    }

    async fn sync_rest(&self, order: &Order) {
        if order.order_kind != OrderKind::Limit || order.remaining_quantity.is_zero() {
            return;
        }
        let Some(price) = order.price else { return };
        let mut book = self.book.lock().await;
        book.cancel_order(order.id);
        book.add_limit_order(order.id, order.user_id, order.side.into(), price, order.remaining_quantity);
    }

    async fn sync_remove(&self, order_id: Uuid) {
        self.book.lock().await.cancel_order(order_id);
    }

    /// Drops a canceled order from the book cache and announces the new top of
    /// book, mirroring the `BookUpdate` published after every trade and rest.
    pub async fn on_order_canceled(&self, events: &EventBus, order_id: Uuid) {
        self.sync_remove(order_id).await;
        let (bids, asks) = self.book_snapshot().await;
        events.publish(MarketEvent::BookUpdate { bids, asks });
    }

    /// Attempt to match `order_id` against resting opposite-side liquidity, one fill
    /// at a time, each in its own transaction, until the order is fully filled, no
    /// compatible counterparty remains, or every candidate has been skipped as a
    /// self-trade. Called right after an order is placed and again by the sweeper
    /// for any order that was left resting.
    pub async fn run_for_order(
        &self,
        pool: &PgPool,
        events: &EventBus,
        fallback_reference_price: Decimal,
        order_id: Uuid,
    ) -> Result<(), OrderError> {
        let mut skip_ids: Vec<Uuid> = Vec::new();

        loop {
            let mut tx = pool.begin().await.map_err(OrderError::Database)?;

            let Some(taker) = Order::lock_in_tx(&mut tx, order_id).await.map_err(OrderError::Database)? else {
                return Ok(());
            };
            if taker.status != OrderStatus::Pending || taker.remaining_quantity.is_zero() {
                tx.rollback().await.ok();
                return Ok(());
            }

            let opposite_side = match taker.side {
                Side::Buy => Side::Sell,
                Side::Sell => Side::Buy,
            };
            let Some(maker) =
                Order::best_opposite_pending_in_tx(&mut tx, opposite_side, &skip_ids).await.map_err(OrderError::Database)?
            else {
                tx.rollback().await.ok();
                self.sync_rest(&taker).await;
                let (bids, asks) = self.book_snapshot().await;
                events.publish(MarketEvent::BookUpdate { bids, asks });
                return Ok(());
            };

            if maker.user_id == taker.user_id {
                skip_ids.push(maker.id);
                tx.rollback().await.ok();
                continue;
            }

            let Some(exec_price) = execution_price(&taker, &maker) else {
                // Both sides are MARKET orders against each other: no reference
                // price exists, so this pair cannot cross. Skip and keep scanning.
                skip_ids.push(maker.id);
                tx.rollback().await.ok();
                continue;
            };
            if !prices_cross(&taker, &maker, exec_price) {
                tx.rollback().await.ok();
                self.sync_rest(&taker).await;
                let (bids, asks) = self.book_snapshot().await;
                events.publish(MarketEvent::BookUpdate { bids, asks });
                return Ok(());
            }

            let fill_quantity = taker.remaining_quantity.min(maker.remaining_quantity);

            let (buy_order, sell_order) = match taker.side {
                Side::Buy => (&taker, &maker),
                Side::Sell => (&maker, &taker),
            };

            let settlement = Wallet::settle(&mut tx, buy_order.user_id, sell_order.user_id, exec_price, fill_quantity).await;
            let (buyer_wallet, seller_wallet) = match settlement {
                Ok(pair) => pair,
                Err(_) => {
                    // The reservation made at entry can't cover this fill (can only
                    // happen for a MARKET order whose slippage ceiling was too tight).
                    // Drop this candidate and keep scanning rather than failing outright.
                    skip_ids.push(maker.id);
                    tx.rollback().await.ok();
                    continue;
                }
            };

            let trade = crate::models::Trade::record_in_tx(
                &mut tx,
                buy_order.id,
                sell_order.id,
                buy_order.user_id,
                sell_order.user_id,
                exec_price,
                fill_quantity,
            )
            .await
            .map_err(OrderError::Database)?;

            let updated_taker = Order::apply_fill_in_tx(&mut tx, taker.id, fill_quantity).await.map_err(OrderError::Database)?;
            let updated_maker = Order::apply_fill_in_tx(&mut tx, maker.id, fill_quantity).await.map_err(OrderError::Database)?;

            tx.commit().await.map_err(OrderError::Database)?;

            if updated_maker.remaining_quantity.is_zero() {
                self.sync_remove(updated_maker.id).await;
            } else {
                self.sync_rest(&updated_maker).await;
            }
            self.sync_remove(updated_taker.id).await;

            let (bids, asks) = self.book_snapshot().await;
            events.publish(MarketEvent::TradeExecuted {
                trade_id: trade.id,
                price: trade.price,
                quantity: trade.quantity,
                timestamp: trade.created_at,
            });
            events.publish(MarketEvent::BookUpdate { bids, asks });
            events.publish(MarketEvent::WalletUpdate {
                user_id: buyer_wallet.user_id,
                balance: buyer_wallet.balance,
                reserved_balance: buyer_wallet.reserved_balance,
                holdings: buyer_wallet.holdings,
                reserved_holdings: buyer_wallet.reserved_holdings,
            });
            events.publish(MarketEvent::WalletUpdate {
                user_id: seller_wallet.user_id,
                balance: seller_wallet.balance,
                reserved_balance: seller_wallet.reserved_balance,
                holdings: seller_wallet.holdings,
                reserved_holdings: seller_wallet.reserved_holdings,
            });

            if updated_taker.remaining_quantity.is_zero() {
                return Ok(());
            }
            // The taker still has quantity left; loop again for the next maker.
            // `skip_ids` resets naturally since a fresh transaction starts the scan over.
        }
    }
}

impl Default for MatchingService {
    fn default() -> Self {
        Self::new()
    }
}

/// The execution price rule: the resting (maker) order's limit price if it has
/// one, otherwise the taker's limit price. `None` only when both sides are
/// MARKET orders, which cannot cross for lack of any reference price.
fn execution_price(taker: &Order, maker: &Order) -> Option<Decimal> {
    maker.price.or(taker.price)
}

fn prices_cross(taker: &Order, maker: &Order, exec_price: Decimal) -> bool {
    match (taker.order_kind, taker.price) {
        (OrderKind::Market, _) => true,
        (OrderKind::Limit, Some(limit)) => match taker.side {
            Side::Buy => limit >= exec_price,
            Side::Sell => limit <= exec_price,
        },
        (OrderKind::Limit, None) => false,
    }
    && match (maker.order_kind, maker.price) {
        (OrderKind::Market, _) => true,
        (OrderKind::Limit, Some(limit)) => match maker.side {
            Side::Buy => limit >= exec_price,
            Side::Sell => limit <= exec_price,
        },
        (OrderKind::Limit, None) => false,
    }
}
