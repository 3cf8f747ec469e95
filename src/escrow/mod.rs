//! Escrow accounting: the ledger and the match resolution rules.

pub mod ledger;
pub mod rules;

pub use ledger::{
    EscrowLedger, LedgerError, LedgerStats, MatchResult, SharedLedger, DEFAULT_MINIMUM_BET,
};
pub use rules::{resolve, Move, Outcome};
