//! Price-time tracker and the four strict-weak orderings used to sort it.
//!
//! `BTreeMap` needs a single, global `Ord` impl per key type, but the book
//! needs four distinct orderings over the same `OrderTracker` data (active
//! bids, active asks, stop bids, stop asks). Rather than reach for a
//! runtime comparator closure, each ordering gets its own zero-sized marker
//! type implementing [`OrderingRule`], and [`Key<R>`] is a thin newtype that
//! delegates `Ord` to `R::compare`. `PhantomData` keeps the marker out of
//! the data itself.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::domain::order::{OrderKind, Side};

/// A lightweight, clonable snapshot of an order's sort-relevant fields.
/// Kept separate from `Order` so the book's ordered indices don't need to
/// clone the full order body on every comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTracker {
    pub id: String,
    pub kind: OrderKind,
    pub price: f64,
    pub side: Side,
    pub timestamp_ns: i64,
}

/// A strict-weak ordering over [`OrderTracker`]. Implementors never look at
/// anything outside `price`, `kind` and `timestamp_ns`.
pub trait OrderingRule {
    fn less(x: &OrderTracker, y: &OrderTracker) -> bool;
}

fn less_active(x: &OrderTracker, y: &OrderTracker, ascending: bool) -> bool {
    if x.kind == OrderKind::Market && y.kind != OrderKind::Market {
        return true;
    }
    if x.kind != OrderKind::Market && y.kind == OrderKind::Market {
        return false;
    }
    if x.kind == OrderKind::Market && y.kind == OrderKind::Market {
        return x.timestamp_ns < y.timestamp_ns;
    }
    let diff = x.price - y.price;
    if diff == 0.0 {
        return x.timestamp_ns < y.timestamp_ns;
    }
    if diff < 0.0 {
        return ascending;
    }
    !ascending
}

fn less_stop(x: &OrderTracker, y: &OrderTracker, ascending: bool) -> bool {
    let diff = x.price - y.price;
    if diff == 0.0 {
        return x.timestamp_ns < y.timestamp_ns;
    }
    if diff < 0.0 {
        return ascending;
    }
    !ascending
}

/// Best bid first: highest price, market orders ahead of limits at any
/// price, ties broken by arrival time.
pub struct ActiveBidRule;
impl OrderingRule for ActiveBidRule {
    fn less(x: &OrderTracker, y: &OrderTracker) -> bool {
        less_active(x, y, false)
    }
}

/// Best ask first: lowest price, market orders ahead of limits.
pub struct ActiveAskRule;
impl OrderingRule for ActiveAskRule {
    fn less(x: &OrderTracker, y: &OrderTracker) -> bool {
        less_active(x, y, true)
    }
}

/// Stop bids ordered by ascending stop price so a market-price scan can
/// break as soon as it passes the threshold.
pub struct StopBidRule;
impl OrderingRule for StopBidRule {
    fn less(x: &OrderTracker, y: &OrderTracker) -> bool {
        less_stop(x, y, true)
    }
}

/// Stop asks ordered by descending stop price, mirroring `StopBidRule`.
pub struct StopAskRule;
impl OrderingRule for StopAskRule {
    fn less(x: &OrderTracker, y: &OrderTracker) -> bool {
        less_stop(x, y, false)
    }
}

/// Newtype wrapper giving `OrderTracker` an `Ord` impl for a specific
/// [`OrderingRule`], so it can be used directly as a `BTreeMap` key.
#[derive(Debug, Clone)]
pub struct Key<R> {
    pub tracker: OrderTracker,
    _rule: PhantomData<R>,
}

impl<R> Key<R> {
    pub fn new(tracker: OrderTracker) -> Self {
        Self { tracker, _rule: PhantomData }
    }
}

impl<R: OrderingRule> PartialEq for Key<R> {
    fn eq(&self, other: &Self) -> bool {
        !R::less(&self.tracker, &other.tracker) && !R::less(&other.tracker, &self.tracker)
    }
}

impl<R: OrderingRule> Eq for Key<R> {}

impl<R: OrderingRule> PartialOrd for Key<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: OrderingRule> Ord for Key<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        if R::less(&self.tracker, &other.tracker) {
            Ordering::Less
        } else if R::less(&other.tracker, &self.tracker) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(kind: OrderKind, price: f64, ts: i64) -> OrderTracker {
        OrderTracker { id: "t".to_string(), kind, price, side: Side::Buy, timestamp_ns: ts }
    }

    #[test]
    fn active_bid_rule_puts_market_orders_first() {
        let market = tracker(OrderKind::Market, 0.0, 5);
        let limit = tracker(OrderKind::Limit, 1000.0, 1);
        assert!(ActiveBidRule::less(&market, &limit));
        assert!(!ActiveBidRule::less(&limit, &market));
    }

    #[test]
    fn active_bid_rule_is_descending_by_price() {
        let high = tracker(OrderKind::Limit, 20.50, 1);
        let low = tracker(OrderKind::Limit, 20.00, 2);
        assert!(ActiveBidRule::less(&high, &low));
    }

    #[test]
    fn active_ask_rule_is_ascending_by_price() {
        let low = tracker(OrderKind::Limit, 20.00, 1);
        let high = tracker(OrderKind::Limit, 20.50, 2);
        assert!(ActiveAskRule::less(&low, &high));
    }

    #[test]
    fn ties_break_on_timestamp() {
        let earlier = tracker(OrderKind::Limit, 20.25, 1);
        let later = tracker(OrderKind::Limit, 20.25, 2);
        assert!(ActiveBidRule::less(&earlier, &later));
        assert!(ActiveAskRule::less(&earlier, &later));
    }

    #[test]
    fn stop_rules_ignore_kind() {
        let market = tracker(OrderKind::Market, 20.00, 1);
        let limit = tracker(OrderKind::Limit, 19.00, 2);
        // lower price sorts first for stop-bid regardless of kind
        assert!(StopBidRule::less(&limit, &market));
    }
}
