//! # fundline-price-guard
//!
//! Safety checks in front of share price updates:
//!
//! - a proposed price may move at most `max_price_change_bps` from the last
//!   validated price of the share class;
//! - valuations older than `max_valuation_age_secs` are stale;
//! - each pool is either Active or Paused. Guardians can pause, only admins
//!   can unpause.

#![deny(unsafe_code)]

pub mod error;
pub mod guard;

pub use error::{GuardError, Result};
pub use guard::{
    price_change_bps, GuardConfig, GuardState, PauseRecord, PriceCheck, PriceGuard,
    DEFAULT_MAX_PRICE_CHANGE_BPS, DEFAULT_MAX_VALUATION_AGE_SECS, MAX_BPS, MAX_VALUATION_AGE_SECS,
};
