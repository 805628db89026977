use chrono::{DateTime, Utc};
use fundline_types::{MathError, PoolId, ShareClassId};
use thiserror::Error;

use crate::share_class::Salt;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareClassError {
    #[error("share class {share_class} not found in {pool}")]
    NotFound {
        pool: PoolId,
        share_class: ShareClassId,
    },

    // --- Metadata ---
    #[error("share class name must be 1..={max} bytes, got {len}")]
    InvalidName { len: usize, max: usize },

    #[error("share class symbol must be 1..={max} bytes, got {len}")]
    InvalidSymbol { len: usize, max: usize },

    #[error("share class salt must be non-zero")]
    ZeroSalt,

    #[error("salt {salt} is already in use")]
    SaltAlreadyUsed { salt: Salt },

    // --- Pricing ---
    #[error("price computed at {computed_at} is in the future (now {now})")]
    FuturePriceTime {
        computed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("price computed at {proposed} is older than the stored price time {stored}")]
    StalePriceTime {
        stored: DateTime<Utc>,
        proposed: DateTime<Utc>,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, ShareClassError>;
