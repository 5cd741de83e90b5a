//! Order persistence port. The backing store (Postgres, etc.) lives outside
//! this crate; only the in-memory reference implementation below ships
//! here, for tests and for a standalone demo.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Order;
use crate::error::RepositoryError;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_order(&self, id: &str) -> Result<Order, RepositoryError>;
    async fn save_order(&self, order: &Order) -> Result<(), RepositoryError>;
}

/// Lock-guarded `HashMap` backing store. Not meant for production use, only
/// for tests and the demo wiring in [`crate::factory`].
#[derive(Default)]
pub struct InMemoryRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_order(&self, id: &str) -> Result<Order, RepositoryError> {
        self.orders
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn save_order(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders.write().await.insert(order.id.clone(), order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::domain::{OrderKind, OrderParams, Side};

    #[tokio::test]
    async fn round_trips_saved_orders() {
        let repo = InMemoryRepository::new();
        let order = Order::new(
            "cust",
            "TEST",
            OrderKind::Limit,
            Side::Buy,
            OrderParams::GTC,
            Decimal::new(2000, -2),
            Decimal::ZERO,
            10,
        );
        repo.save_order(&order).await.unwrap();
        let found = repo.find_order(&order.id).await.unwrap();
        assert_eq!(found.id, order.id);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(repo.find_order("missing").await, Err(RepositoryError::NotFound(_))));
    }
}
