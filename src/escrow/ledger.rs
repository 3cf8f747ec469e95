//! Escrow accounting for two-player wagered matches.
//!
//! The ledger is the sole mutator of monetary state. Per player, funds live
//! in two pools: deposited balance (stakeable, refundable) and winnings
//! (owed from resolved matches, withdrawable). Every operation either
//! completes and emits exactly one event, or fails with no state change.
//!
//! Amounts are `u128` minimal currency units, so negative balances are
//! unrepresentable and every sum reachable through these operations fits.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::escrow::rules::{resolve, Move, Outcome};
use crate::events::{EventSink, LedgerEvent};
use crate::transfer::{TransferError, Treasury};

/// Smallest accepted deposit and per-player stake, in minimal currency
/// units.
pub const DEFAULT_MINIMUM_BET: u128 = 100;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("deposit of {amount} is below the {minimum} unit minimum")]
    InsufficientDeposit { amount: u128, minimum: u128 },

    #[error("{player} has no balance to refund")]
    NothingToRefund { player: String },

    #[error("{player} must have at least {minimum} units on deposit to play")]
    InsufficientStake { player: String, minimum: u128 },

    #[error("{caller} is not the arbiter")]
    Unauthorized { caller: String },

    #[error("{player} has no winnings to withdraw")]
    NothingToWithdraw { player: String },

    #[error("payout failed: {0}")]
    TransferFailed(#[from] TransferError),
}

// ============================================================================
// RESULT & STATS TYPES
// ============================================================================

/// What one `play` call redistributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning player, or `None` on a draw.
    pub winner: Option<String>,
    /// Value moved into the winner's winnings: the full pot on a decisive
    /// match, 0 on a draw.
    pub rewarded: u128,
}

/// Snapshot of ledger totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_enrolled: u128,
    pub total_refunded: u128,
    pub total_withdrawn: u128,
    pub open_balances: u128,
    pub unclaimed_winnings: u128,
    pub enrolled_players: usize,
    pub players_with_winnings: usize,
}

// ============================================================================
// ESCROW LEDGER
// ============================================================================

/// Owner of all player balances and winnings.
///
/// The arbiter identity and the two external seams (treasury, event sink)
/// are fixed at construction. Collaborators are invoked inside the
/// operation, so callers serialize operations via [`SharedLedger`].
pub struct EscrowLedger {
    arbiter: String,
    minimum_bet: u128,
    /// Deposited, not yet staked. Zero balances are not retained.
    balances: HashMap<String, u128>,
    /// Owed from resolved matches. Zero entries are not retained.
    winnings: HashMap<String, u128>,
    total_enrolled: u128,
    total_refunded: u128,
    total_withdrawn: u128,
    treasury: Arc<dyn Treasury>,
    events: Arc<dyn EventSink>,
}

/// The ledger behind its critical section.
///
/// Every operation runs under this one mutex, so each call is a single
/// critical section and the two-player `play` needs no per-player lock
/// ordering. Payouts run inside the guard: the internal debit and the
/// external transfer commit or roll back as one unit.
pub type SharedLedger = Arc<Mutex<EscrowLedger>>;

impl EscrowLedger {
    pub fn new(
        arbiter: String,
        minimum_bet: u128,
        treasury: Arc<dyn Treasury>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            arbiter,
            minimum_bet,
            balances: HashMap::new(),
            winnings: HashMap::new(),
            total_enrolled: 0,
            total_refunded: 0,
            total_withdrawn: 0,
            treasury,
            events,
        }
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    pub fn arbiter(&self) -> &str {
        &self.arbiter
    }

    pub fn minimum_bet(&self) -> u128 {
        self.minimum_bet
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Deposit `amount` into `player`'s escrow balance. Accumulates across
    /// calls; the balance only grows here.
    pub fn enroll(&mut self, player: &str, amount: u128) -> Result<(), LedgerError> {
        if amount < self.minimum_bet {
            return Err(LedgerError::InsufficientDeposit {
                amount,
                minimum: self.minimum_bet,
            });
        }

        let balance = self.balances.entry(player.to_string()).or_insert(0);
        *balance += amount;
        self.total_enrolled += amount;
        debug!(player, %amount, balance = %*balance, "deposit accepted");

        self.events.emit(&LedgerEvent::Enrolled {
            player: player.to_string(),
            amount,
        });
        Ok(())
    }

    /// Return `player`'s full unplayed deposit. The balance is zeroed before
    /// the payout call and restored only if the payout errors, so the rail
    /// never observes a spendable balance mid-transfer.
    pub fn refund(&mut self, player: &str) -> Result<u128, LedgerError> {
        let amount = match self.balances.remove(player) {
            Some(amount) if amount > 0 => amount,
            _ => {
                return Err(LedgerError::NothingToRefund {
                    player: player.to_string(),
                })
            }
        };

        if let Err(err) = self.treasury.pay_out(player, amount) {
            self.balances.insert(player.to_string(), amount);
            return Err(LedgerError::TransferFailed(err));
        }

        self.total_refunded += amount;
        info!(player, %amount, "deposit refunded");
        self.events.emit(&LedgerEvent::Refunded {
            player: player.to_string(),
            amount,
        });
        Ok(amount)
    }

    /// Resolve one match between two enrolled players. Arbiter only.
    ///
    /// Both stakes are consumed in full regardless of outcome; only what was
    /// on deposit at call time is at risk, and a later enrollment starts a
    /// fresh balance. Stakes may be unequal: a winner takes the entire
    /// combined pot.
    pub fn play(
        &mut self,
        caller: &str,
        player_a: &str,
        move_a: Move,
        player_b: &str,
        move_b: Move,
    ) -> Result<MatchResult, LedgerError> {
        if caller != self.arbiter {
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        let stake_a = self.balances.get(player_a).copied().unwrap_or(0);
        // A player cannot stake against themself: the second stake read
        // observes the first stake already consumed.
        let stake_b = if player_a == player_b {
            0
        } else {
            self.balances.get(player_b).copied().unwrap_or(0)
        };

        // Both stakes are checked before anything is taken; a failed call
        // leaves both balances untouched.
        if stake_a < self.minimum_bet {
            return Err(LedgerError::InsufficientStake {
                player: player_a.to_string(),
                minimum: self.minimum_bet,
            });
        }
        if stake_b < self.minimum_bet {
            return Err(LedgerError::InsufficientStake {
                player: player_b.to_string(),
                minimum: self.minimum_bet,
            });
        }

        self.balances.remove(player_a);
        self.balances.remove(player_b);

        let result = match resolve(move_a, move_b) {
            Outcome::Draw => {
                // No value crosses players: each stake returns to its own
                // player as winnings.
                *self.winnings.entry(player_a.to_string()).or_insert(0) += stake_a;
                *self.winnings.entry(player_b.to_string()).or_insert(0) += stake_b;
                info!(player_a, player_b, "match drawn, stakes returned");
                MatchResult {
                    winner: None,
                    rewarded: 0,
                }
            }
            outcome => {
                let winner = if outcome == Outcome::FirstWins {
                    player_a
                } else {
                    player_b
                };
                let pot = stake_a + stake_b;
                *self.winnings.entry(winner.to_string()).or_insert(0) += pot;
                info!(winner, %pot, "match resolved");
                MatchResult {
                    winner: Some(winner.to_string()),
                    rewarded: pot,
                }
            }
        };

        self.events.emit(&LedgerEvent::Played {
            winner: result.winner.clone(),
            amount: result.rewarded,
        });
        Ok(result)
    }

    /// Pay out `player`'s accumulated winnings. Same zero-then-pay
    /// discipline as [`refund`](Self::refund).
    pub fn withdraw(&mut self, player: &str) -> Result<u128, LedgerError> {
        let amount = match self.winnings.remove(player) {
            Some(amount) if amount > 0 => amount,
            _ => {
                return Err(LedgerError::NothingToWithdraw {
                    player: player.to_string(),
                })
            }
        };

        if let Err(err) = self.treasury.pay_out(player, amount) {
            self.winnings.insert(player.to_string(), amount);
            return Err(LedgerError::TransferFailed(err));
        }

        self.total_withdrawn += amount;
        info!(player, %amount, "winnings withdrawn");
        self.events.emit(&LedgerEvent::Withdrew {
            player: player.to_string(),
            amount,
        });
        Ok(amount)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn balance_of(&self, player: &str) -> u128 {
        self.balances.get(player).copied().unwrap_or(0)
    }

    pub fn winnings_of(&self, player: &str) -> u128 {
        self.winnings.get(player).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total_enrolled: self.total_enrolled,
            total_refunded: self.total_refunded,
            total_withdrawn: self.total_withdrawn,
            open_balances: self.balances.values().sum(),
            unclaimed_winnings: self.winnings.values().sum(),
            enrolled_players: self.balances.len(),
            players_with_winnings: self.winnings.len(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
