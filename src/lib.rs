//! Two-player wagering escrow for rock-paper-scissors matches.
//!
//! Players deposit funds, a trusted arbiter resolves matches, and winners
//! accumulate and withdraw rewards. The accounting core ([`escrow`]) is the
//! sole mutator of monetary state; caller verification, transport, and the
//! outbound currency rail sit at injected seams around it.
//!
//! ## Architecture
//!
//! - **Core**: `EscrowLedger` behind one mutex (every operation is a
//!   single critical section)
//! - **Server**: Axum
//! - **Auth**: Ed25519 signatures over canonical command strings
//! - **Events**: one structured notification per successful operation,
//!   never on failure

pub mod auth;
pub mod config;
pub mod escrow;
pub mod events;
pub mod routes;
pub mod transfer;

// ============================================================================
// PUBLIC API
// ============================================================================

// Accounting core
pub use escrow::ledger::{
    EscrowLedger, LedgerError, LedgerStats, MatchResult, SharedLedger, DEFAULT_MINIMUM_BET,
};
pub use escrow::rules::{resolve, Move, Outcome};

// Seams
pub use events::{EventSink, LedgerEvent, MemorySink, TracingSink};
pub use transfer::{InMemoryTreasury, RejectingTreasury, TransferError, Treasury};

// Configuration
pub use config::{Config, ConfigError};
