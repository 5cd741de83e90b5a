//! The order book: per-instrument state, admission, matching and stop-order
//! activation. Grounded directly on the original service's `order_book.go`;
//! every public method here mirrors one of its exported methods, including
//! the documented quirks in SPEC_FULL.md §4 (lazy cancellation cleanup, the
//! buy/sell price-selection asymmetry, swallowed match-loop errors).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::decimal::Decimal;
use crate::domain::order::MIN_QTY;
use crate::domain::{ActiveOrderSet, EventTradeSuccess, Order, OrderKind, OrderParams, OrderTracker, Side, StopOrderSet};
use crate::error::OrderBookError;
use crate::repository::Repository;

/// Trade channel capacity. A bounded channel gives the matching loop
/// natural backpressure: a slow consumer stalls matching rather than
/// letting trade history grow unbounded.
const TRADE_CHANNEL_CAPACITY: usize = 10_000;

struct BookState {
    active_orders: HashMap<String, Order>,
    orders: ActiveOrderSet,
}

pub struct OrderBook {
    pub ticker_symbol: String,
    market_price: RwLock<Decimal>,
    repo: Arc<dyn Repository>,
    book_state: RwLock<BookState>,
    stop_orders: RwLock<StopOrderSet>,
    trade_tx: mpsc::Sender<EventTradeSuccess>,
    trade_rx: Mutex<Option<mpsc::Receiver<EventTradeSuccess>>>,
}

impl OrderBook {
    pub fn new(ticker_symbol: impl Into<String>, market_price: Decimal, repo: Arc<dyn Repository>) -> Self {
        let (trade_tx, trade_rx) = mpsc::channel(TRADE_CHANNEL_CAPACITY);
        Self {
            ticker_symbol: ticker_symbol.into(),
            market_price: RwLock::new(market_price),
            repo,
            book_state: RwLock::new(BookState { active_orders: HashMap::new(), orders: ActiveOrderSet::new() }),
            stop_orders: RwLock::new(StopOrderSet::new()),
            trade_tx,
            trade_rx: Mutex::new(Some(trade_rx)),
        }
    }

    /// Takes ownership of the trade receiver. Only one consumer may ever
    /// drain a book's trade stream; later calls return `None`.
    pub async fn take_trade_receiver(&self) -> Option<mpsc::Receiver<EventTradeSuccess>> {
        self.trade_rx.lock().await.take()
    }

    pub async fn market_price(&self) -> Decimal {
        *self.market_price.read().await
    }

    pub async fn get_bids(&self) -> Vec<Order> {
        self.snapshot_active(Side::Buy).await
    }

    pub async fn get_asks(&self) -> Vec<Order> {
        self.snapshot_active(Side::Sell).await
    }

    async fn snapshot_active(&self, side: Side) -> Vec<Order> {
        let state = self.book_state.read().await;
        state.orders.iter(side).into_iter().filter_map(|t| state.active_orders.get(&t.id).cloned()).collect()
    }

    pub async fn get_stop_bids(&self) -> Vec<Order> {
        self.snapshot_stop(Side::Buy).await
    }

    pub async fn get_stop_asks(&self) -> Vec<Order> {
        self.snapshot_stop(Side::Sell).await
    }

    async fn snapshot_stop(&self, side: Side) -> Vec<Order> {
        let trackers = self.stop_orders.read().await.iter(side);
        let state = self.book_state.read().await;
        trackers.into_iter().filter_map(|t| state.active_orders.get(&t.id).cloned()).collect()
    }

    /// Sets the market price, then activates any parked stop orders whose
    /// trigger price the new price has crossed. Activation re-enters
    /// `submit`, which may itself cross the spread and call back into this
    /// method — recursive activation is intended, not a bug.
    pub async fn set_market_price(&self, price: Decimal, f_price: f64) {
        *self.market_price.write().await = price;

        let bids = self.stop_orders.read().await.find_all_bids_below(f_price);
        self.activate_orders(bids).await;
        let asks = self.stop_orders.read().await.find_all_asks_above(f_price);
        self.activate_orders(asks).await;
    }

    async fn activate_orders(&self, trackers: Vec<OrderTracker>) {
        for stop_tracker in trackers {
            let Some(order) = self.find_active_order(&stop_tracker.id).await else {
                panic!("order with id {} not found in active orders", stop_tracker.id);
            };
            self.stop_orders.write().await.remove(&stop_tracker.id);

            // rebuild the tracker from the order's own (limit/market) price,
            // not the stop price it was parked under
            let fresh_tracker = OrderTracker {
                id: order.id.clone(),
                kind: order.kind,
                price: order.price.to_f64(),
                side: order.side,
                timestamp_ns: timestamp_ns(&order),
            };
            if let Err(e) = self.submit(order, fresh_tracker).await {
                tracing::error!(error = %e, "failed to submit activated stop order");
            }
        }
    }

    async fn find_active_order(&self, id: &str) -> Option<Order> {
        self.book_state.read().await.active_orders.get(id).cloned()
    }

    fn set_active_order(state: &mut BookState, order: Order) -> Result<(), OrderBookError> {
        if state.active_orders.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrderId(order.id));
        }
        state.active_orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn add_to_books(&self, tracker: OrderTracker) {
        self.book_state.write().await.orders.add(tracker);
    }

    /// Mirrors the original's `storeOrder`: on a duplicate-id failure it
    /// always tries to roll back `orders` by id, even along the stop-park
    /// path where nothing was added there — a harmless no-op in that case,
    /// preserved rather than special-cased away.
    async fn store_order(&self, order: Order) -> Result<(), OrderBookError> {
        let order_id = order.id.clone();
        let result = {
            let mut state = self.book_state.write().await;
            Self::set_active_order(&mut state, order.clone())
        };
        if let Err(e) = result {
            self.book_state.write().await.orders.remove(&order_id);
            return Err(e);
        }
        self.repo.save_order(&order).await.map_err(OrderBookError::from)
    }

    async fn update_active_order(&self, order: &Order) -> Result<(), OrderBookError> {
        {
            let mut state = self.book_state.write().await;
            if !state.active_orders.contains_key(&order.id) {
                return Err(OrderBookError::OrderNotStored(order.id.clone()));
            }
            state.active_orders.insert(order.id.clone(), order.clone());
        }
        self.repo.save_order(order).await.map_err(OrderBookError::from)
    }

    async fn remove_from_books(&self, order_id: &str) {
        let Some(order) = self.find_active_order(order_id).await else { return };
        if let Err(e) = self.repo.save_order(&order).await {
            tracing::warn!(order_id, error = %e, "failed to persist order before removal from books");
        }
        let mut state = self.book_state.write().await;
        state.orders.remove(order_id);
        state.active_orders.remove(order_id);
    }

    /// Idempotent. A cancelled resting order is only actually dropped from
    /// the book the next time a match walk passes over it — see
    /// `match_order`.
    pub async fn cancel(&self, id: &str) -> Result<(), OrderBookError> {
        let Some(mut order) = self.find_active_order(id).await else { return Ok(()) };
        order.cancel();
        self.update_active_order(&order).await
    }

    /// Admits a new order. Returns `true` if it matched (partially or
    /// fully), `false` otherwise (including when parked as a stop order).
    pub async fn add(&self, order: Order) -> Result<bool, OrderBookError> {
        if order.qty <= MIN_QTY {
            return Err(OrderBookError::InvalidQty);
        }
        if order.kind == OrderKind::Market && !order.price.is_zero() {
            return Err(OrderBookError::InvalidMarketPrice);
        }
        if order.kind == OrderKind::Limit && order.price.is_zero() {
            return Err(OrderBookError::InvalidLimitPrice);
        }
        if order.params.contains(OrderParams::STOP) && order.stop_price.is_zero() {
            return Err(OrderBookError::InvalidStopPrice);
        }

        let tracker = OrderTracker {
            id: order.id.clone(),
            kind: order.kind,
            price: order.price.to_f64(),
            side: order.side,
            timestamp_ns: timestamp_ns(&order),
        };

        if order.params.contains(OrderParams::STOP) {
            let market_price = self.market_price().await;
            let stop_tracker = OrderTracker {
                id: order.id.clone(),
                kind: order.kind,
                price: order.stop_price.to_f64(),
                side: order.side,
                timestamp_ns: timestamp_ns(&order),
            };

            let parks = match order.side {
                Side::Buy => market_price < order.stop_price,
                Side::Sell => market_price > order.stop_price,
            };
            if parks {
                self.stop_orders.write().await.add(stop_tracker);
                self.store_order(order).await?;
                return Ok(false);
            }
        }

        self.submit(order, tracker).await
    }

    async fn submit(&self, mut order: Order, tracker: OrderTracker) -> Result<bool, OrderBookError> {
        let contra_side = order.side.opposite();
        let matched = self.match_order(tracker.price, &mut order, contra_side).await;

        let mut add_to_books = true;
        if order.params.contains(OrderParams::IOC) && !order.is_filled() {
            order.cancel();
            self.repo.save_order(&order).await.map_err(OrderBookError::from)?;
            add_to_books = false;
        }

        if !order.is_filled() && add_to_books {
            self.add_to_books(tracker).await;
            self.store_order(order).await?;
        }
        Ok(matched)
    }

    /// Walks the contra side in priority order, matching the taker against
    /// resting orders one at a time. Any errors persisting an updated
    /// resting order abort the walk early — mirroring `submit`'s own
    /// decision to swallow this function's error return entirely.
    async fn match_order(&self, order_price_f: f64, taker: &mut Order, contra_side: Side) -> bool {
        let mut matched = false;
        let buying = taker.is_bid();
        let mut buyer = String::new();
        let mut seller = String::new();
        let mut bid_order_id = String::new();
        let mut ask_order_id = String::new();
        if buying {
            buyer = taker.customer_id.clone();
            bid_order_id = taker.id.clone();
        } else {
            seller = taker.customer_id.clone();
            ask_order_id = taker.id.clone();
        }

        let snapshot = self.book_state.read().await.orders.iter(contra_side);
        let mut to_remove: Vec<String> = Vec::new();

        for contra_tracker in snapshot {
            if taker.is_filled() {
                break;
            }
            let Some(mut resting) = self.find_active_order(&contra_tracker.id).await else {
                panic!("tracker exists but active order does not: {}", contra_tracker.id);
            };

            if resting.cancelled {
                to_remove.push(resting.id.clone());
                continue;
            }

            let qty = taker.unfilled_qty().min(resting.unfilled_qty());
            if taker.params.contains(OrderParams::AON) && qty != taker.unfilled_qty() {
                continue;
            }
            if resting.params.contains(OrderParams::AON) && qty != resting.unfilled_qty() {
                continue;
            }

            let (price, f_price) = match (taker.kind, resting.kind) {
                (OrderKind::Market, OrderKind::Market) => continue,
                (OrderKind::Market, OrderKind::Limit) => (resting.price, contra_tracker.price),
                (OrderKind::Limit, OrderKind::Market) => (taker.price, order_price_f),
                (OrderKind::Limit, OrderKind::Limit) => {
                    if buying {
                        if taker.price < resting.price {
                            self.flush_removals(&to_remove).await;
                            return matched;
                        }
                        (taker.price, order_price_f)
                    } else {
                        if taker.price > resting.price {
                            self.flush_removals(&to_remove).await;
                            return matched;
                        }
                        (resting.price, contra_tracker.price)
                    }
                }
            };

            if buying {
                seller = resting.customer_id.clone();
                ask_order_id = resting.id.clone();
            } else {
                buyer = resting.customer_id.clone();
                bid_order_id = resting.id.clone();
            }

            taker.filled_qty += qty;
            resting.filled_qty += qty;
            matched = true;

            if resting.unfilled_qty() == 0 {
                to_remove.push(resting.id.clone());
            } else if let Err(e) = self.update_active_order(&resting).await {
                tracing::error!(error = %e, order_id = %resting.id, "failed to persist partially filled resting order");
                self.flush_removals(&to_remove).await;
                return matched;
            }

            let event = EventTradeSuccess {
                id: Uuid::new_v4().to_string(),
                buyer: buyer.clone(),
                seller: seller.clone(),
                ticker_symbol: self.ticker_symbol.clone(),
                qty,
                price,
                bid_order_id: bid_order_id.clone(),
                ask_order_id: ask_order_id.clone(),
                timestamp: Utc::now(),
            };
            self.emit_trade(event).await;
            self.set_market_price(price, f_price).await;
        }

        self.flush_removals(&to_remove).await;
        matched
    }

    async fn flush_removals(&self, ids: &[String]) {
        for id in ids {
            self.remove_from_books(id).await;
        }
    }

    async fn emit_trade(&self, event: EventTradeSuccess) {
        tracing::debug!(trade_id = %event.id, qty = event.qty, price = %event.price, "trade executed");
        // a full channel applies backpressure straight to the matching loop
        if self.trade_tx.send(event).await.is_err() {
            tracing::warn!("trade channel closed; no consumer is draining trades");
        }
    }
}

fn timestamp_ns(order: &Order) -> i64 {
    order.created_at.timestamp_nanos_opt().unwrap_or(0)
}
