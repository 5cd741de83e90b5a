//! Trade event emitted to the book's trade channel on every match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTradeSuccess {
    pub id: String,
    pub buyer: String,
    pub seller: String,
    pub ticker_symbol: String,
    pub qty: u64,
    pub price: Decimal,
    pub bid_order_id: String,
    pub ask_order_id: String,
    pub timestamp: DateTime<Utc>,
}
