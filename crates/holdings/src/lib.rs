//! # fundline-holdings
//!
//! Position state per (pool, share class, asset): quantity, value, the
//! valuation provider that prices it, and the ledger accounts it posts to.
//!
//! Asset holdings link four accounts (Asset, Equity, Gain, Loss); liability
//! holdings link two (Expense, Liability). Every movement posts a balanced
//! debit/credit pair into the caller's open journal scope.

#![deny(unsafe_code)]

pub mod error;
pub mod holding;
pub mod tracker;

pub use error::{HoldingsError, Result};
pub use holding::{
    Holding, HoldingAccount, HoldingKey, HoldingSnapshot, ASSET_ROLES, LIABILITY_ROLES,
};
pub use tracker::{HoldingsCheckpoint, HoldingsTracker};
