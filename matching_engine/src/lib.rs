use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};

pub use uuid::Uuid;

pub type OrderId = Uuid;
pub type UserId = Uuid;

// Decimal supports the precision needed for both fiat (2dp) and asset (8dp) quantities.
pub type Price = Decimal;
pub type Quantity = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub remaining_quantity: Quantity,
}

impl Order {
    pub fn new_limit(id: OrderId, user: UserId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            user,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity,
            remaining_quantity: quantity,
        }
    }

    pub fn new_market(id: OrderId, user: UserId, side: Side, quantity: Quantity) -> Self {
        Self {
            id,
            user,
            side,
            order_type: OrderType::Market,
            price: None,
            quantity,
            remaining_quantity: quantity,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }
}

#[derive(Debug, Clone)]
struct PriceLevel {
    #[allow(dead_code)]
    price: Price,
    orders: VecDeque<Order>,
    total_quantity: Quantity,
}

impl PriceLevel {
    fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: Decimal::ZERO,
        }
    }

    fn add_order(&mut self, order: Order) {
        self.total_quantity += order.remaining_quantity;
        self.orders.push_back(order);
    }

    fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// One resting level as observed from outside the book, for top-of-book snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSnapshot {
    pub price: Price,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: UserId,
    pub seller: UserId,
    pub price: Price,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub fills: Vec<Fill>,
}

pub struct OrderBook {
    // BTreeMap for price levels, sorted by price.
    // For bids: higher prices first (descending, read from the back).
    // For asks: lower prices first (ascending, read from the front).
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: HashMap<OrderId, Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    /// Inserts a new limit order identified by `id`, matching it against the
    /// book immediately and resting any unfilled remainder. `id` is expected
    /// to already have been persisted by the caller (it is never generated here).
    pub fn add_limit_order(
        &mut self,
        id: OrderId,
        user: UserId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> OrderResult {
        let mut order = Order::new_limit(id, user, side, price, quantity);
        let mut fills = Vec::new();

        self.match_order(&mut order, &mut fills);

        if !order.is_filled() {
            self.add_order_to_book(order.clone());
        }

        OrderResult { order_id: id, fills }
    }

    /// Inserts a new market order. Market orders never rest: whatever is not
    /// filled against current liquidity is left to the caller to cancel.
    pub fn add_market_order(&mut self, id: OrderId, user: UserId, side: Side, quantity: Quantity) -> OrderResult {
        let mut order = Order::new_market(id, user, side, quantity);
        let mut fills = Vec::new();

        self.match_order(&mut order, &mut fills);

        OrderResult { order_id: id, fills }
    }

    pub fn cancel_order(&mut self, order_id: OrderId) -> bool {
        let Some(order) = self.orders.remove(&order_id) else {
            return false;
        };

        self.remove_order_from_book(&order);
        true
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    pub fn quantity_at_price(&self, side: Side, price: Price) -> Quantity {
        let book = match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        };
        book.get(&price).map_or(Decimal::ZERO, |level| level.total_quantity)
    }

    /// Top `depth` resting levels on one side, best price first, for book-update events.
    pub fn top_levels(&self, side: Side, depth: usize) -> Vec<LevelSnapshot> {
        let snapshot = |price: &Price, level: &PriceLevel| LevelSnapshot {
            price: *price,
            quantity: level.total_quantity,
        };
        match side {
            Side::Bid => self.bids.iter().rev().take(depth).map(|(p, l)| snapshot(p, l)).collect(),
            Side::Ask => self.asks.iter().take(depth).map(|(p, l)| snapshot(p, l)).collect(),
        }
    }

    fn match_order(&mut self, order: &mut Order, fills: &mut Vec<Fill>) {
        let opposite_book = match order.side {
            Side::Bid => &mut self.asks,
            Side::Ask => &mut self.bids,
        };

        // Bids match against lowest asks first, asks match against highest bids first.
        let prices_to_match: Vec<Price> = if order.side == Side::Ask {
            opposite_book.keys().copied().rev().collect()
        } else {
            opposite_book.keys().copied().collect()
        };

        let mut prices_to_remove = Vec::new();

        for price in prices_to_match {
            if order.is_filled() {
                break;
            }

            let can_match = match order.order_type {
                OrderType::Market => true,
                OrderType::Limit => {
                    let order_price = order.price.unwrap();
                    match order.side {
                        Side::Bid => price <= order_price,
                        Side::Ask => price >= order_price,
                    }
                }
            };

            if !can_match {
                break;
            }

            let Some(level) = opposite_book.get_mut(&price) else {
                continue;
            };

            // Orders from the taker's own account are skipped rather than matched,
            // but stay resting at their original position once this pass is done.
            let mut self_trades: Vec<Order> = Vec::new();

            while !level.orders.is_empty() && !order.is_filled() {
                let mut opposite_order = level.orders.pop_front().unwrap();

                if opposite_order.user == order.user {
                    self_trades.push(opposite_order);
                    continue;
                }

                let fill_quantity = order.remaining_quantity.min(opposite_order.remaining_quantity);

                order.remaining_quantity -= fill_quantity;
                opposite_order.remaining_quantity -= fill_quantity;
                level.total_quantity -= fill_quantity;

                let fill = match order.side {
                    Side::Bid => Fill {
                        buy_order_id: order.id,
                        sell_order_id: opposite_order.id,
                        buyer: order.user,
                        seller: opposite_order.user,
                        price,
                        quantity: fill_quantity,
                    },
                    Side::Ask => Fill {
                        buy_order_id: opposite_order.id,
                        sell_order_id: order.id,
                        buyer: opposite_order.user,
                        seller: order.user,
                        price,
                        quantity: fill_quantity,
                    },
                };
                fills.push(fill);

                if opposite_order.is_filled() {
                    self.orders.remove(&opposite_order.id);
                } else {
                    level.orders.push_front(opposite_order.clone());
                    self.orders.insert(opposite_order.id, opposite_order);
                }
            }

            // Restore skipped self-trades to the front, in their original relative order.
            for skipped in self_trades.into_iter().rev() {
                level.orders.push_front(skipped);
            }

            if level.is_empty() {
                prices_to_remove.push(price);
            }
        }

        for price in prices_to_remove {
            opposite_book.remove(&price);
        }
    }

    fn add_order_to_book(&mut self, order: Order) {
        let price = order.price.expect("limit order must have a price");
        let book = match order.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };

        self.orders.insert(order.id, order.clone());

        book.entry(price).or_insert_with(|| PriceLevel::new(price)).add_order(order);
    }

    fn remove_order_from_book(&mut self, order: &Order) {
        let Some(price) = order.price else {
            return;
        };

        let book = match order.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };

        let Some(level) = book.get_mut(&price) else {
            return;
        };

        let mut removed_quantity = Decimal::ZERO;
        level.orders.retain(|o| {
            if o.id == order.id {
                removed_quantity = o.remaining_quantity;
                false
            } else {
                true
            }
        });
        level.total_quantity -= removed_quantity;

        if level.is_empty() {
            book.remove(&price);
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    // Two fixed accounts used whenever a test isn't specifically about self-trading.
    fn alice() -> Uuid {
        Uuid::from_u128(0xA11CE)
    }
    fn bob() -> Uuid {
        Uuid::from_u128(0xB0B)
    }

    #[test]
    fn test_create_orderbook() {
        let ob = OrderBook::new();
        assert_eq!(ob.best_bid(), None);
        assert_eq!(ob.best_ask(), None);
    }

    #[test]
    fn test_add_limit_bid() {
        let mut ob = OrderBook::new();
        let result = ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.order_id, oid(1));
        assert_eq!(result.fills.len(), 0);
        assert_eq!(ob.best_bid(), Some(Decimal::from(100)));
    }

    #[test]
    fn test_add_limit_ask() {
        let mut ob = OrderBook::new();
        let result = ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.order_id, oid(1));
        assert_eq!(result.fills.len(), 0);
        assert_eq!(ob.best_ask(), Some(Decimal::from(100)));
    }

    #[test]
    fn test_simple_match() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));
        let result = ob.add_limit_order(oid(2), bob(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[0].quantity, Decimal::from(10));
        assert_eq!(result.fills[0].buyer, bob());
        assert_eq!(result.fills[0].seller, alice());

        assert_eq!(ob.best_bid(), None);
        assert_eq!(ob.best_ask(), None);
    }

    #[test]
    fn test_partial_fill() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));
        let result = ob.add_limit_order(oid(2), bob(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].quantity, Decimal::from(5));

        assert_eq!(ob.best_bid(), Some(Decimal::from(100)));
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(100)), Decimal::from(5));
    }

    #[test]
    fn test_partial_fill_across_levels() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));
        ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(101), Decimal::from(5));
        ob.add_limit_order(oid(3), alice(), Side::Ask, Decimal::from(102), Decimal::from(5));

        let result = ob.add_limit_order(oid(4), bob(), Side::Bid, Decimal::from(102), Decimal::from(12));

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[0].quantity, Decimal::from(5));
        assert_eq!(result.fills[1].price, Decimal::from(101));
        assert_eq!(result.fills[1].quantity, Decimal::from(5));
        assert_eq!(result.fills[2].price, Decimal::from(102));
        assert_eq!(result.fills[2].quantity, Decimal::from(2));

        assert_eq!(ob.best_ask(), Some(Decimal::from(102)));
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(102)), Decimal::from(3));
    }

    #[test]
    fn test_market_order_buy() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));
        ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(101), Decimal::from(5));

        let result = ob.add_market_order(oid(3), bob(), Side::Bid, Decimal::from(7));

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[0].quantity, Decimal::from(5));
        assert_eq!(result.fills[1].price, Decimal::from(101));
        assert_eq!(result.fills[1].quantity, Decimal::from(2));

        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(101)), Decimal::from(3));
    }

    #[test]
    fn test_market_order_sell() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(100), Decimal::from(5));
        ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(99), Decimal::from(5));

        let result = ob.add_market_order(oid(3), bob(), Side::Ask, Decimal::from(7));

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[0].quantity, Decimal::from(5));
        assert_eq!(result.fills[1].price, Decimal::from(99));
        assert_eq!(result.fills[1].quantity, Decimal::from(2));

        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(99)), Decimal::from(3));
    }

    #[test]
    fn test_cancel_order() {
        let mut ob = OrderBook::new();

        let result = ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(ob.best_bid(), Some(Decimal::from(100)));

        assert!(ob.cancel_order(result.order_id));
        assert_eq!(ob.best_bid(), None);
        assert!(!ob.cancel_order(result.order_id));
    }

    #[test]
    fn test_spread() {
        let mut ob = OrderBook::new();

        assert_eq!(ob.spread(), None);

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(99), Decimal::from(10));
        ob.add_limit_order(oid(2), bob(), Side::Ask, Decimal::from(101), Decimal::from(10));

        assert_eq!(ob.spread(), Some(Decimal::from(2)));
    }

    #[test]
    fn test_price_priority() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(102), Decimal::from(5));
        ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));
        ob.add_limit_order(oid(3), alice(), Side::Ask, Decimal::from(101), Decimal::from(5));

        assert_eq!(ob.best_ask(), Some(Decimal::from(100)));

        let result = ob.add_market_order(oid(4), bob(), Side::Bid, Decimal::from(12));

        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[1].price, Decimal::from(101));
        assert_eq!(result.fills[2].price, Decimal::from(102));
    }

    #[test]
    fn test_time_priority() {
        let mut ob = OrderBook::new();

        let result1 = ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));
        let result2 = ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));

        let result = ob.add_limit_order(oid(3), bob(), Side::Bid, Decimal::from(100), Decimal::from(5));
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].sell_order_id, result1.order_id);

        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(100)), Decimal::from(5));

        let result = ob.add_limit_order(oid(4), bob(), Side::Bid, Decimal::from(100), Decimal::from(5));
        assert_eq!(result.fills[0].sell_order_id, result2.order_id);
    }

    #[test]
    fn test_no_match_when_prices_dont_cross() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(101), Decimal::from(10));
        let result = ob.add_limit_order(oid(2), bob(), Side::Bid, Decimal::from(99), Decimal::from(10));

        assert_eq!(result.fills.len(), 0);
        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));
        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));
    }

    #[test]
    fn test_market_order_with_empty_book() {
        let mut ob = OrderBook::new();

        let result = ob.add_market_order(oid(1), alice(), Side::Bid, Decimal::from(10));
        assert_eq!(result.fills.len(), 0);
    }

    #[test]
    fn test_complex_scenario() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(95), Decimal::from(10));
        ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(96), Decimal::from(15));
        ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(97), Decimal::from(20));

        ob.add_limit_order(oid(4), bob(), Side::Ask, Decimal::from(103), Decimal::from(10));
        ob.add_limit_order(oid(5), bob(), Side::Ask, Decimal::from(102), Decimal::from(15));
        ob.add_limit_order(oid(6), bob(), Side::Ask, Decimal::from(101), Decimal::from(20));

        assert_eq!(ob.best_bid(), Some(Decimal::from(97)));
        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));
        assert_eq!(ob.spread(), Some(Decimal::from(4)));

        let result = ob.add_market_order(oid(7), bob(), Side::Ask, Decimal::from(40));

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].price, Decimal::from(97));
        assert_eq!(result.fills[0].quantity, Decimal::from(20));
        assert_eq!(result.fills[1].price, Decimal::from(96));
        assert_eq!(result.fills[1].quantity, Decimal::from(15));
        assert_eq!(result.fills[2].price, Decimal::from(95));
        assert_eq!(result.fills[2].quantity, Decimal::from(5));

        assert_eq!(ob.best_bid(), Some(Decimal::from(95)));
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(95)), Decimal::from(5));
        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));
    }

    #[test]
    fn test_multiple_orders_same_level() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(3));
        ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(100), Decimal::from(4));
        ob.add_limit_order(oid(3), alice(), Side::Ask, Decimal::from(100), Decimal::from(5));

        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(100)), Decimal::from(12));

        let result = ob.add_limit_order(oid(4), bob(), Side::Bid, Decimal::from(100), Decimal::from(8));

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].quantity, Decimal::from(3));
        assert_eq!(result.fills[1].quantity, Decimal::from(4));
        assert_eq!(result.fills[2].quantity, Decimal::from(1));

        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(100)), Decimal::from(4));
    }

    #[test]
    fn test_cancel_partial_filled_order() {
        let mut ob = OrderBook::new();

        let result = ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(100), Decimal::from(20));
        ob.add_limit_order(oid(2), bob(), Side::Ask, Decimal::from(100), Decimal::from(5));

        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(100)), Decimal::from(15));

        assert!(ob.cancel_order(result.order_id));
        assert_eq!(ob.best_bid(), None);
    }

    #[test]
    fn test_market_order_partial_liquidity() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));
        let result = ob.add_market_order(oid(2), bob(), Side::Bid, Decimal::from(20));

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].quantity, Decimal::from(10));
        assert_eq!(ob.best_ask(), None);
    }

    #[test]
    fn test_self_trade_is_skipped_and_advances() {
        let mut ob = OrderBook::new();

        // alice rests an ask; her own crossing bid must not trade against it,
        // but should still reach bob's ask behind it at the same price.
        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));
        ob.add_limit_order(oid(2), bob(), Side::Ask, Decimal::from(100), Decimal::from(10));

        let result = ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].seller, bob());
        assert_eq!(result.fills[0].quantity, Decimal::from(10));

        // alice's own resting ask is untouched and still in the book.
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(100)), Decimal::from(10));
    }

    #[test]
    fn test_self_trade_only_level_does_not_cross() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));
        let result = ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));

        assert_eq!(result.fills.len(), 0);
        assert_eq!(ob.best_bid(), Some(Decimal::from(100)));
        assert_eq!(ob.best_ask(), Some(Decimal::from(100)));
    }

    #[test]
    fn test_bid_matching_multiple_asks() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Ask, Decimal::from(100), Decimal::from(10));
        ob.add_limit_order(oid(2), alice(), Side::Ask, Decimal::from(101), Decimal::from(10));
        ob.add_limit_order(oid(3), alice(), Side::Ask, Decimal::from(102), Decimal::from(10));
        ob.add_limit_order(oid(4), alice(), Side::Ask, Decimal::from(103), Decimal::from(10));

        let result = ob.add_limit_order(oid(5), bob(), Side::Bid, Decimal::from(102), Decimal::from(25));

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].price, Decimal::from(100));
        assert_eq!(result.fills[0].quantity, Decimal::from(10));
        assert_eq!(result.fills[1].price, Decimal::from(101));
        assert_eq!(result.fills[1].quantity, Decimal::from(10));
        assert_eq!(result.fills[2].price, Decimal::from(102));
        assert_eq!(result.fills[2].quantity, Decimal::from(5));

        assert_eq!(ob.best_ask(), Some(Decimal::from(102)));
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(102)), Decimal::from(5));
    }

    #[test]
    fn test_ask_matching_multiple_bids() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(103), Decimal::from(10));
        ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(102), Decimal::from(10));
        ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(101), Decimal::from(10));
        ob.add_limit_order(oid(4), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));

        let result = ob.add_limit_order(oid(5), bob(), Side::Ask, Decimal::from(101), Decimal::from(25));

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].price, Decimal::from(103));
        assert_eq!(result.fills[0].quantity, Decimal::from(10));
        assert_eq!(result.fills[1].price, Decimal::from(102));
        assert_eq!(result.fills[1].quantity, Decimal::from(10));
        assert_eq!(result.fills[2].price, Decimal::from(101));
        assert_eq!(result.fills[2].quantity, Decimal::from(5));

        assert_eq!(ob.best_bid(), Some(Decimal::from(101)));
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(101)), Decimal::from(5));
    }

    #[test]
    fn test_large_orderbook_scenario() {
        let mut ob = OrderBook::new();

        for i in 90..=99 {
            ob.add_limit_order(oid(i), alice(), Side::Bid, Decimal::from(i as i64), Decimal::from(10));
        }

        for i in 101..=110 {
            ob.add_limit_order(oid(i + 1000), alice(), Side::Ask, Decimal::from(i as i64), Decimal::from(10));
        }

        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));
        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));
        assert_eq!(ob.spread(), Some(Decimal::from(2)));

        let result = ob.add_market_order(oid(9999), bob(), Side::Ask, Decimal::from(95));

        assert_eq!(result.fills.len(), 10);

        for i in 0..9 {
            assert_eq!(result.fills[i].price, Decimal::from((99 - i) as i64));
            assert_eq!(result.fills[i].quantity, Decimal::from(10));
        }
        assert_eq!(result.fills[9].price, Decimal::from(90));
        assert_eq!(result.fills[9].quantity, Decimal::from(5));

        assert_eq!(ob.best_bid(), Some(Decimal::from(90)));
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(90)), Decimal::from(5));
    }

    #[test]
    fn test_interleaved_orders() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(98), Decimal::from(10));
        ob.add_limit_order(oid(2), bob(), Side::Ask, Decimal::from(102), Decimal::from(10));
        ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(99), Decimal::from(10));
        ob.add_limit_order(oid(4), bob(), Side::Ask, Decimal::from(101), Decimal::from(10));
        ob.add_limit_order(oid(5), alice(), Side::Bid, Decimal::from(97), Decimal::from(10));
        ob.add_limit_order(oid(6), bob(), Side::Ask, Decimal::from(103), Decimal::from(10));

        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));
        assert_eq!(ob.best_ask(), Some(Decimal::from(101)));

        let result = ob.add_limit_order(oid(7), alice(), Side::Bid, Decimal::from(102), Decimal::from(15));

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].price, Decimal::from(101));
        assert_eq!(result.fills[0].quantity, Decimal::from(10));
        assert_eq!(result.fills[1].price, Decimal::from(102));
        assert_eq!(result.fills[1].quantity, Decimal::from(5));

        assert_eq!(ob.best_ask(), Some(Decimal::from(102)));
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(102)), Decimal::from(5));
    }

    #[test]
    fn test_complete_fill_across_many_levels() {
        let mut ob = OrderBook::new();

        for i in 100..110 {
            ob.add_limit_order(oid(i), alice(), Side::Ask, Decimal::from(i as i64), Decimal::from(10));
        }

        let result = ob.add_limit_order(oid(999), bob(), Side::Bid, Decimal::from(109), Decimal::from(100));

        assert_eq!(result.fills.len(), 10);

        let total_filled: Decimal = result.fills.iter().map(|f| f.quantity).sum();
        assert_eq!(total_filled, Decimal::from(100));
        assert_eq!(ob.best_ask(), None);
    }

    #[test]
    fn test_top_levels_snapshot() {
        let mut ob = OrderBook::new();

        ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(99), Decimal::from(10));
        ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(98), Decimal::from(5));
        ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(97), Decimal::from(1));

        let top = ob.top_levels(Side::Bid, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].price, Decimal::from(99));
        assert_eq!(top[1].price, Decimal::from(98));
    }

    #[test]
    fn test_empty_book_operations() {
        let ob = OrderBook::new();

        assert_eq!(ob.best_bid(), None);
        assert_eq!(ob.best_ask(), None);
        assert_eq!(ob.spread(), None);
        assert_eq!(ob.quantity_at_price(Side::Bid, Decimal::from(100)), Decimal::from(0));
        assert_eq!(ob.quantity_at_price(Side::Ask, Decimal::from(100)), Decimal::from(0));
    }

    #[test]
    fn test_cancel_nonexistent_order() {
        let mut ob = OrderBook::new();
        assert!(!ob.cancel_order(oid(999)));
    }

    #[test]
    fn test_multiple_cancellations() {
        let mut ob = OrderBook::new();

        let r1 = ob.add_limit_order(oid(1), alice(), Side::Bid, Decimal::from(100), Decimal::from(10));
        let r2 = ob.add_limit_order(oid(2), alice(), Side::Bid, Decimal::from(99), Decimal::from(10));
        let r3 = ob.add_limit_order(oid(3), alice(), Side::Bid, Decimal::from(98), Decimal::from(10));

        assert_eq!(ob.best_bid(), Some(Decimal::from(100)));

        assert!(ob.cancel_order(r1.order_id));
        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));

        assert!(ob.cancel_order(r3.order_id));
        assert_eq!(ob.best_bid(), Some(Decimal::from(99)));

        assert!(ob.cancel_order(r2.order_id));
        assert_eq!(ob.best_bid(), None);
    }
}
