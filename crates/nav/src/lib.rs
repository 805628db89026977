//! # fundline-nav
//!
//! Net asset value per (pool, network), read straight from ledger balances:
//!
//! ```text
//! NAV = max(0, Equity + Gain − Loss − Liability)
//! ```
//!
//! Each network owns four accounts (Equity, Gain, Loss, Liability) whose ids
//! are derived from the network id; asset and expense accounts are derived
//! from the asset id. `close_gain_loss` is the only place unrealized P&L
//! becomes equity.

#![deny(unsafe_code)]

pub mod accounts;
pub mod calculator;
pub mod error;

pub use accounts::{
    asset_account, equity_account, expense_account, gain_account, liability_account,
    loss_account, network_accounts,
};
pub use calculator::{NavCalculator, NetworkAccountValues};
pub use error::{NavError, Result};
