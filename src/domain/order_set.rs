//! Ordered order-tracker collection: a price-ordered index per side plus a
//! secondary by-id index for O(log n) removal.

use std::collections::{BTreeMap, HashMap};

use crate::domain::order::Side;
use crate::domain::tracker::{ActiveAskRule, ActiveBidRule, Key, OrderTracker, OrderingRule, StopAskRule, StopBidRule};

/// Generic over the bid and ask orderings so the same implementation backs
/// both the active book (market-first, price-time priority) and the parked
/// stop-order book (price-time only).
pub struct OrderSet<BidRule, AskRule> {
    bids: BTreeMap<Key<BidRule>, ()>,
    asks: BTreeMap<Key<AskRule>, ()>,
    by_id: HashMap<String, OrderTracker>,
}

pub type ActiveOrderSet = OrderSet<ActiveBidRule, ActiveAskRule>;
pub type StopOrderSet = OrderSet<StopBidRule, StopAskRule>;

impl<BidRule: OrderingRule, AskRule: OrderingRule> Default for OrderSet<BidRule, AskRule> {
    fn default() -> Self {
        Self { bids: BTreeMap::new(), asks: BTreeMap::new(), by_id: HashMap::new() }
    }
}

impl<BidRule: OrderingRule, AskRule: OrderingRule> OrderSet<BidRule, AskRule> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tracker: OrderTracker) {
        match tracker.side {
            Side::Buy => {
                self.bids.insert(Key::new(tracker.clone()), ());
            }
            Side::Sell => {
                self.asks.insert(Key::new(tracker.clone()), ());
            }
        }
        self.by_id.insert(tracker.id.clone(), tracker);
    }

    pub fn remove(&mut self, id: &str) {
        let Some(tracker) = self.by_id.remove(id) else { return };
        match tracker.side {
            Side::Buy => {
                self.bids.remove(&Key::new(tracker));
            }
            Side::Sell => {
                self.asks.remove(&Key::new(tracker));
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<&OrderTracker> {
        self.by_id.get(id)
    }

    pub fn len(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    pub fn is_empty(&self, side: Side) -> bool {
        self.len(side) == 0
    }

    /// Snapshot of the requested side in priority order. Matching walks
    /// iterate this snapshot rather than holding a live iterator over the
    /// map, so the book stays mutable (e.g. for stop-order activation)
    /// while a walk is in progress. See SPEC_FULL.md §4 for the rationale.
    pub fn iter(&self, side: Side) -> Vec<OrderTracker> {
        match side {
            Side::Buy => self.bids.keys().map(|k| k.tracker.clone()).collect(),
            Side::Sell => self.asks.keys().map(|k| k.tracker.clone()).collect(),
        }
    }

    /// Stop-ask trackers priced at or above `price`, re-sorted by arrival
    /// time. Stop asks are stored in descending price order, so the scan
    /// can stop as soon as it sees a price below the threshold.
    pub fn find_all_asks_above(&self, price: f64) -> Vec<OrderTracker> {
        let mut results = Vec::new();
        for key in self.asks.keys() {
            if key.tracker.price >= price {
                results.push(key.tracker.clone());
            } else {
                break;
            }
        }
        results.sort_by_key(|t| t.timestamp_ns);
        results
    }

    /// Stop-bid trackers priced at or below `price`, re-sorted by arrival
    /// time. Stop bids are stored in ascending price order.
    pub fn find_all_bids_below(&self, price: f64) -> Vec<OrderTracker> {
        let mut results = Vec::new();
        for key in self.bids.keys() {
            if key.tracker.price <= price {
                results.push(key.tracker.clone());
            } else {
                break;
            }
        }
        results.sort_by_key(|t| t.timestamp_ns);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderKind;

    fn tracker(id: &str, side: Side, kind: OrderKind, price: f64, ts: i64) -> OrderTracker {
        OrderTracker { id: id.to_string(), kind, price, side, timestamp_ns: ts }
    }

    #[test]
    fn active_asks_are_priced_ascending() {
        let mut set = ActiveOrderSet::new();
        set.add(tracker("a", Side::Sell, OrderKind::Limit, 20.50, 1));
        set.add(tracker("b", Side::Sell, OrderKind::Limit, 20.10, 2));
        let ordered = set.iter(Side::Sell);
        assert_eq!(ordered[0].id, "b");
        assert_eq!(ordered[1].id, "a");
    }

    #[test]
    fn active_bids_are_priced_descending() {
        let mut set = ActiveOrderSet::new();
        set.add(tracker("a", Side::Buy, OrderKind::Limit, 20.00, 1));
        set.add(tracker("b", Side::Buy, OrderKind::Limit, 20.50, 2));
        let ordered = set.iter(Side::Buy);
        assert_eq!(ordered[0].id, "b");
        assert_eq!(ordered[1].id, "a");
    }

    #[test]
    fn remove_drops_from_both_indices() {
        let mut set = ActiveOrderSet::new();
        set.add(tracker("a", Side::Buy, OrderKind::Limit, 20.00, 1));
        set.remove("a");
        assert!(set.find("a").is_none());
        assert_eq!(set.len(Side::Buy), 0);
    }

    #[test]
    fn stop_bids_scan_ascending_and_stop_early() {
        let mut set = StopOrderSet::new();
        set.add(tracker("a", Side::Buy, OrderKind::Limit, 19.00, 1));
        set.add(tracker("b", Side::Buy, OrderKind::Limit, 21.00, 2));
        let eligible = set.find_all_bids_below(20.00);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "a");
    }

    #[test]
    fn find_all_results_are_sorted_by_arrival() {
        let mut set = StopOrderSet::new();
        set.add(tracker("later", Side::Sell, OrderKind::Limit, 20.00, 20));
        set.add(tracker("earlier", Side::Sell, OrderKind::Limit, 20.00, 5));
        let eligible = set.find_all_asks_above(19.00);
        assert_eq!(eligible[0].id, "earlier");
        assert_eq!(eligible[1].id, "later");
    }
}
