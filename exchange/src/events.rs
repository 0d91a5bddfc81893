use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct LevelSnapshot {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl From<matching_engine::LevelSnapshot> for LevelSnapshot {
    fn from(l: matching_engine::LevelSnapshot) -> Self {
        Self { price: l.price, quantity: l.quantity }
    }
}

/// The three event kinds the bus fans out, queued in a post-commit outbox and
/// only ever published after the transaction that produced them has committed.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    TradeExecuted {
        trade_id: Uuid,
        price: Decimal,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    },
    BookUpdate {
        bids: Vec<LevelSnapshot>,
        asks: Vec<LevelSnapshot>,
    },
    WalletUpdate {
        user_id: Uuid,
        balance: Decimal,
        reserved_balance: Decimal,
        holdings: Decimal,
        reserved_holdings: Decimal,
    },
}

impl MarketEvent {
    /// Recipients of a WalletUpdate are limited to the wallet's own owner;
    /// everything else is broadcast to every subscriber.
    pub fn target_user(&self) -> Option<Uuid> {
        match self {
            MarketEvent::WalletUpdate { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    /// Renders the wire frame, a plain text line (not JSON envelope) matching
    /// the textual transport the subscriber side expects.
    pub fn to_frame(&self) -> String {
        match self {
            MarketEvent::TradeExecuted { trade_id, price, quantity, timestamp } => format!(
                "Trade Executed | id={} price={} quantity={} at={}",
                trade_id, price, quantity, timestamp.to_rfc3339()
            ),
            MarketEvent::BookUpdate { bids, asks } => {
                let body = serde_json::json!({ "bids": bids, "asks": asks });
                format!("Order Book Update: {}", body)
            }
            MarketEvent::WalletUpdate { user_id, balance, reserved_balance, holdings, reserved_holdings } => {
                format!(
                    "Wallet Update | User {}: balance={} reserved_balance={} holdings={} reserved_holdings={}",
                    user_id, balance, reserved_balance, holdings, reserved_holdings
                )
            }
        }
    }
}

/// Thin wrapper around a `tokio::sync::broadcast` channel. Never fed from
/// inside a transaction -- callers accumulate events locally and hand them
/// here only once the enclosing `tx.commit()` has returned `Ok`.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(4096);
        Self { tx }
    }

    pub fn publish(&self, event: MarketEvent) {
        // A send failure just means there are currently no subscribers; that's
        // not an error the matching engine needs to care about.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
