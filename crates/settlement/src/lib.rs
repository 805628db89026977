//! # fundline-settlement
//!
//! Converts an epoch's deposit and redemption fulfillments at a single share
//! price:
//!
//! ```text
//! shares = amount · SCALE / price     (deposits)
//! assets = shares · price / SCALE     (redemptions)
//! ```
//!
//! Both round down and reject a zero result. Issuance is pushed to the share
//! class registry aggregated per network, and a [`BatchSummary`] is kept per
//! (pool, share class, epoch).

#![deny(unsafe_code)]

pub mod error;
pub mod settlement;

pub use error::{Result, SettlementError};
pub use settlement::{
    calculate_assets_for_redeem, calculate_shares_for_deposit, preview_deposits,
    preview_redemptions, BatchSettlement, BatchSummary, DepositFulfillment, FulfillmentResult,
    RedeemFulfillment,
};
