//! Ledger notifications.
//!
//! Every successful operation emits exactly one event, after its state
//! transition has been applied. Failed operations emit nothing, so
//! consumers may treat an event as proof the transition happened.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Structured notification for one successful ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Enrolled {
        player: String,
        amount: u128,
    },
    Refunded {
        player: String,
        amount: u128,
    },
    /// `winner` is `None` on a draw. `amount` is the value moved to the
    /// winner's winnings: the full pot on a decisive match, 0 on a draw
    /// (each stake returns to its own player).
    Played {
        winner: Option<String>,
        amount: u128,
    },
    Withdrew {
        player: String,
        amount: u128,
    },
}

/// Sink for ledger notifications, injected at ledger construction.
///
/// Implementations run inside the operation's critical section and must not
/// call back into the ledger.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LedgerEvent);
}

/// Emits events as structured log lines.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Enrolled { player, amount } => {
                info!(%player, %amount, "enrolled");
            }
            LedgerEvent::Refunded { player, amount } => {
                info!(%player, %amount, "refunded");
            }
            LedgerEvent::Played { winner, amount } => {
                let winner = winner.as_deref().unwrap_or("none");
                info!(winner, %amount, "played");
            }
            LedgerEvent::Withdrew { player, amount } => {
                info!(%player, %amount, "withdrew");
            }
        }
    }
}

/// Records events in memory. The assertion surface for tests.
#[derive(Default)]
pub struct MemorySink {
    events: parking_lot::Mutex<Vec<LedgerEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<LedgerEvent> {
        self.events.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}
