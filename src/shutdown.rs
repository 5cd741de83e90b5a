//! Graceful shutdown signal shared by the trade-event consumers spawned by
//! [`crate::provider::MatchingService::start`]. A thin wrapper around
//! `tokio_util`'s `CancellationToken`, in the same shape as the upstream
//! service's own shutdown controller.

use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// A child token that is cancelled whenever the parent is, but can also
    /// be cancelled independently without affecting siblings.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
