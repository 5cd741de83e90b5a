//! Service layer: routes orders to the right instrument's book and drains
//! each book's trade stream. Mirrors the upstream `OrderProviderImpl`,
//! including its most surprising behavior: `submit_order` re-validates
//! redundantly (surfacing those failures to the caller) but only *logs*
//! an error returned from the underlying book's `add` — it never reaches
//! the caller. See SPEC_FULL.md §4 for why that is preserved, not fixed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::book::OrderBook;
use crate::domain::order::MIN_QTY;
use crate::domain::{Order, OrderKind, OrderParams};
use crate::error::ProviderError;
use crate::shutdown::ShutdownController;

#[async_trait]
pub trait Provider: Send + Sync {
    async fn start(&self);
    async fn submit_order(&self, order: Order) -> Result<(), ProviderError>;
    async fn list_all_asks(&self, ticker_symbol: &str) -> Result<Vec<Order>, ProviderError>;
    async fn list_all_bids(&self, ticker_symbol: &str) -> Result<Vec<Order>, ProviderError>;
}

pub struct MatchingService {
    books: HashMap<String, Arc<OrderBook>>,
    shutdown: ShutdownController,
}

impl MatchingService {
    pub fn new(books: HashMap<String, Arc<OrderBook>>) -> Self {
        Self { books, shutdown: ShutdownController::new() }
    }

    /// Signals every spawned trade consumer to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    fn book(&self, ticker_symbol: &str) -> Result<&Arc<OrderBook>, ProviderError> {
        self.books.get(ticker_symbol).ok_or_else(|| ProviderError::InvalidTickerSymbol(ticker_symbol.to_string()))
    }
}

#[async_trait]
impl Provider for MatchingService {
    async fn start(&self) {
        for (ticker_symbol, book) in &self.books {
            let book = book.clone();
            let ticker_symbol = ticker_symbol.clone();
            let token = self.shutdown.child_token();
            tokio::spawn(consume_trade_events(ticker_symbol, book, token));
        }
    }

    async fn submit_order(&self, order: Order) -> Result<(), ProviderError> {
        let book = self.book(&order.ticker_symbol)?;

        if order.qty <= MIN_QTY {
            return Err(ProviderError::InvalidQty);
        }
        if order.kind == OrderKind::Market && !order.price.is_zero() {
            return Err(ProviderError::InvalidMarketPrice);
        }
        if order.kind == OrderKind::Limit && order.price.is_zero() {
            return Err(ProviderError::InvalidLimitPrice);
        }
        if order.params.contains(OrderParams::STOP) && order.stop_price.is_zero() {
            return Err(ProviderError::InvalidStopPrice);
        }

        tracing::info!(order_id = %order.id, ticker_symbol = %order.ticker_symbol, "submitting order to order book");
        if let Err(e) = book.add(order).await {
            tracing::error!(error = %e, "failed to add order to order book");
        }
        Ok(())
    }

    async fn list_all_asks(&self, ticker_symbol: &str) -> Result<Vec<Order>, ProviderError> {
        Ok(self.book(ticker_symbol)?.get_asks().await)
    }

    async fn list_all_bids(&self, ticker_symbol: &str) -> Result<Vec<Order>, ProviderError> {
        Ok(self.book(ticker_symbol)?.get_bids().await)
    }
}

async fn consume_trade_events(ticker_symbol: String, book: Arc<OrderBook>, token: CancellationToken) {
    let Some(mut rx) = book.take_trade_receiver().await else { return };
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => tracing::info!(
                    trade_id = %event.id, ticker_symbol = %ticker_symbol, qty = event.qty, price = %event.price,
                    "trade executed"
                ),
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::domain::Side;
    use crate::factory::demo_books;
    use crate::repository::InMemoryRepository;

    fn make_order(side: Side, kind: OrderKind, price: Decimal, qty: u64) -> Order {
        Order::new("cust", "TEST", kind, side, OrderParams::GTC, price, Decimal::ZERO, qty)
    }

    #[tokio::test]
    async fn submit_order_rejects_unknown_ticker_symbol() {
        let service = MatchingService::new(demo_books(InMemoryRepository::new()));
        let mut order = make_order(Side::Buy, OrderKind::Limit, Decimal::new(2000, -2), 10);
        order.ticker_symbol = "NOPE".to_string();
        let result = service.submit_order(order).await;
        assert!(matches!(result, Err(ProviderError::InvalidTickerSymbol(_))));
    }

    #[tokio::test]
    async fn submit_order_accepts_valid_limit_order() {
        let service = MatchingService::new(demo_books(InMemoryRepository::new()));
        let order = make_order(Side::Buy, OrderKind::Limit, Decimal::new(2000, -2), 10);
        assert!(service.submit_order(order).await.is_ok());
        let bids = service.list_all_bids("TEST").await.unwrap();
        assert_eq!(bids.len(), 1);
    }

    #[tokio::test]
    async fn submit_order_swallows_book_level_errors() {
        let service = MatchingService::new(demo_books(InMemoryRepository::new()));
        let first = make_order(Side::Buy, OrderKind::Limit, Decimal::new(2000, -2), 10);
        let mut second = make_order(Side::Buy, OrderKind::Limit, Decimal::new(2000, -2), 5);
        second.id = first.id.clone();

        assert!(service.submit_order(first).await.is_ok());
        // `add` rejects this as a duplicate id, but submit_order only logs it
        // and still returns Ok — see SPEC_FULL.md §4.
        assert!(service.submit_order(second).await.is_ok());
        let bids = service.list_all_bids("TEST").await.unwrap();
        assert_eq!(bids.len(), 1);
    }
}
