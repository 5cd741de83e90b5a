//! Wiring for a fixed set of demo instrument books, mirroring the upstream
//! service's own demo-mode factory (which seeds a single `TEST` book at
//! market price 20.25).

use std::collections::HashMap;
use std::sync::Arc;

use crate::book::OrderBook;
use crate::decimal::Decimal;
use crate::repository::Repository;

/// Seeds the books this deployment trades. Backing repository
/// implementations are out of scope for this crate; callers plug in their
/// own `Repository` behind the shared `Arc`.
pub fn demo_books(repo: Arc<dyn Repository>) -> HashMap<String, Arc<OrderBook>> {
    let mut books = HashMap::new();
    books.insert(
        "TEST".to_string(),
        Arc::new(OrderBook::new("TEST", Decimal::new(2025, -2), repo)),
    );
    books
}
