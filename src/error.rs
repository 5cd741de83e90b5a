//! Error taxonomy, one enum per concern, matching the upstream service's
//! habit of not collapsing validation, persistence and routing errors into
//! a single catch-all.

use thiserror::Error;

/// Errors surfaced by an [`crate::book::OrderBook`] itself: admission
/// validation and the handful of invariants its own bookkeeping relies on.
#[derive(Debug, Error)]
pub enum OrderBookError {
    #[error("invalid quantity provided")]
    InvalidQty,
    #[error("price has to be zero for market orders")]
    InvalidMarketPrice,
    #[error("price has to be set for limit orders")]
    InvalidLimitPrice,
    #[error("stop price has to be set for a stop order")]
    InvalidStopPrice,
    #[error("order with id {0} already exists")]
    DuplicateOrderId(String),
    #[error("order with id {0} hasn't been stored yet")]
    OrderNotStored(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors surfaced by the [`crate::repository::Repository`] port.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("order not found: {0}")]
    NotFound(String),
    #[error("repository error: {0}")]
    Other(String),
}

/// Errors surfaced by the [`crate::provider::Provider`] service layer,
/// i.e. the redundant validation `SubmitOrder` performs before routing to
/// the right book. Errors the book itself returns from `Add` are logged,
/// not surfaced here — see `Provider::submit_order`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid ticker symbol: {0}")]
    InvalidTickerSymbol(String),
    #[error("invalid quantity provided")]
    InvalidQty,
    #[error("price has to be zero for market orders")]
    InvalidMarketPrice,
    #[error("price has to be set for limit orders")]
    InvalidLimitPrice,
    #[error("stop price has to be set for a stop order")]
    InvalidStopPrice,
}
