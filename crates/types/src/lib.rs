//! # fundline-types
//!
//! Shared vocabulary for the Fundline ledger and valuation engine:
//!
//! - **Identifiers**: pools, networks, assets, share classes, accounts.
//!   Account ids for holdings and networks are derived, never stored.
//! - **Fixed point**: `D18` prices and a 256-bit `mul_div` with explicit
//!   rounding.
//! - **Capabilities**: the valuation provider and pool authority
//!   interfaces consumed by the core, plus the `Clock` used to stamp records.

#![deny(unsafe_code)]

pub mod authority;
pub mod clock;
pub mod ids;
pub mod math;
pub mod valuation;

pub use authority::{PoolAuthority, StaticAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{
    AccountId, AccountType, ActorId, AssetId, EpochId, JournalId, NetworkId, NormalSide, PoolId,
    ShareClassId, ValuationId,
};
pub use math::{checked_add, mul_div, Amount, MathError, Rounding, SignedAmount, D18, SCALE};
pub use valuation::{IdentityValuation, OracleValuation, ValuationError, ValuationProvider};
