//! Order model: side, kind, condition flags and the order itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Decimal;

/// Minimum quantity accepted by the book. A quantity of exactly this value
/// is rejected — see `OrderBookError::InvalidQty`.
pub const MIN_QTY: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
}

bitflags::bitflags! {
    /// Order condition flags. `FOK` is a derived combination, not an
    /// independent bit, matching the upstream bitmask layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct OrderParams: u16 {
        const STOP = 0x1;
        const AON  = 0x2;
        const IOC  = 0x4;
        const GTC  = 0x10;
        const GFD  = 0x20;
        const GTD  = 0x40;
        const FOK  = Self::IOC.bits() | Self::AON.bits();
    }
}

/// A single resting or incoming order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub ticker_symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    pub params: OrderParams,
    /// Zero for market orders, the limit price for limit orders.
    pub price: Decimal,
    /// Zero unless `params` contains `STOP`.
    pub stop_price: Decimal,
    pub qty: u64,
    pub filled_qty: u64,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: impl Into<String>,
        ticker_symbol: impl Into<String>,
        kind: OrderKind,
        side: Side,
        params: OrderParams,
        price: Decimal,
        stop_price: Decimal,
        qty: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.into(),
            ticker_symbol: ticker_symbol.into(),
            kind,
            side,
            params,
            price,
            stop_price,
            qty,
            filled_qty: 0,
            cancelled: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_bid(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_ask(&self) -> bool {
        self.side == Side::Sell
    }

    pub fn is_filled(&self) -> bool {
        self.filled_qty >= self.qty
    }

    pub fn unfilled_qty(&self) -> u64 {
        self.qty.saturating_sub(self.filled_qty)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}
