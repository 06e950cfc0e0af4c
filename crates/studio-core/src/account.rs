use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::AccountError;

/// Owner of a user's credit balance.
///
/// `deduct_credits` must check and decrement in one atomic step so that
/// sessions sharing an account never lose updates.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_credits(&self) -> Result<u64, AccountError>;

    async fn deduct_credits(&self, amount: u64) -> Result<(), AccountError>;
}

/// Process-local balance, used for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryAccount {
    credits: AtomicU64,
}

impl InMemoryAccount {
    pub fn new(credits: u64) -> Self {
        Self {
            credits: AtomicU64::new(credits),
        }
    }

    pub fn balance(&self) -> u64 {
        self.credits.load(Ordering::SeqCst)
    }

    /// Add credits, saturating at `u64::MAX`.
    pub fn grant(&self, amount: u64) {
        let _ = self
            .credits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(amount))
            });
    }
}

#[async_trait]
impl AccountStore for InMemoryAccount {
    async fn get_credits(&self) -> Result<u64, AccountError> {
        Ok(self.balance())
    }

    async fn deduct_credits(&self, amount: u64) -> Result<(), AccountError> {
        self.credits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_sub(amount)
            })
            .map(|_| ())
            .map_err(|available| AccountError::InsufficientCredits {
                required: amount,
                available,
            })
    }
}
