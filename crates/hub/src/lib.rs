//! # fundline-hub
//!
//! Epoch orchestration over the Fundline components. A [`PoolHub`] owns the
//! ledger, holdings tracker, NAV calculator, share class registry, price
//! guard and batch settlement, and runs each epoch as:
//!
//! 1. guard and freshness preconditions;
//! 2. one journal scope: revalue holdings, price the share class from pool
//!    NAV, post deposit and redemption movements, commit;
//! 3. store the price, record it with the guard, update issuance and the
//!    batch summary;
//! 4. optionally fold gain/loss into equity.
//!
//! A failure in step 2 aborts the scope and restores holdings.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hub;
pub mod telemetry;

pub use config::{ConfigError, EpochConfig, HubConfig, LoggingConfig};
pub use error::{HubError, Result};
pub use hub::{EpochReport, EpochRequest, PoolHub, Revaluation};
pub use telemetry::init_tracing;
