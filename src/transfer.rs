//! Outbound currency transfers.
//!
//! Refund and withdraw push value out through the environment's transfer
//! primitive, which can fail. The accounting core only sees this trait, so
//! the rail behind it (an in-process map here, a payment network in a real
//! deployment) is swappable without touching the ledger.

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer to {0} rejected")]
    Rejected(String),

    #[error("transfer rail unavailable: {0}")]
    Unavailable(String),
}

/// The environment's outbound transfer primitive.
pub trait Treasury: Send + Sync {
    /// Move `amount` out of the ledger to `player`. A returned error means
    /// no value moved.
    fn pay_out(&self, player: &str, amount: u128) -> Result<(), TransferError>;
}

/// In-process treasury tracking cumulative payouts per player.
#[derive(Default)]
pub struct InMemoryTreasury {
    paid: DashMap<String, u128>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid out to one player over the treasury's lifetime.
    pub fn paid_to(&self, player: &str) -> u128 {
        self.paid.get(player).map(|entry| *entry.value()).unwrap_or(0)
    }

    /// Total paid out to all players.
    pub fn total_paid(&self) -> u128 {
        self.paid.iter().map(|entry| *entry.value()).sum()
    }
}

impl Treasury for InMemoryTreasury {
    fn pay_out(&self, player: &str, amount: u128) -> Result<(), TransferError> {
        *self.paid.entry(player.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

/// Treasury that refuses every payout. Exercises the rollback path in tests.
pub struct RejectingTreasury;

impl Treasury for RejectingTreasury {
    fn pay_out(&self, player: &str, _amount: u128) -> Result<(), TransferError> {
        Err(TransferError::Rejected(player.to_string()))
    }
}
