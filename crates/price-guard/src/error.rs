use chrono::{DateTime, Utc};
use fundline_types::{ActorId, AssetId, MathError, PoolId, ShareClassId, D18};
use thiserror::Error;

use crate::guard::GuardState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    // --- Authorization ---
    #[error("{actor} is not an admin of {pool}")]
    NotAdmin { pool: PoolId, actor: ActorId },

    #[error("{actor} may not pause {pool}")]
    NotGuardian { pool: PoolId, actor: ActorId },

    // --- State machine ---
    #[error("guard of {pool} is {actual}, expected {expected}")]
    InvalidState {
        pool: PoolId,
        expected: GuardState,
        actual: GuardState,
    },

    #[error("pool {pool} is paused")]
    Paused { pool: PoolId },

    // --- Configuration ---
    #[error("max price change {bps} bps exceeds {max} bps")]
    InvalidMaxChange { bps: u32, max: u32 },

    #[error("max valuation age must be positive")]
    ZeroValuationAge,

    #[error("max valuation age {secs}s exceeds {max}s")]
    ValuationAgeTooLarge { secs: u64, max: u64 },

    // --- Limits ---
    #[error(
        "price change of {change_bps} bps for {share_class} exceeds {max_bps} bps ({previous} -> {proposed})"
    )]
    PriceChangeTooLarge {
        share_class: ShareClassId,
        previous: D18,
        proposed: D18,
        change_bps: u32,
        max_bps: u32,
    },

    #[error("valuation of {asset} is stale: last updated {last_updated:?}, max age {max_age_secs}s")]
    StaleValuation {
        asset: AssetId,
        last_updated: Option<DateTime<Utc>>,
        max_age_secs: u64,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, GuardError>;
