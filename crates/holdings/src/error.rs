use fundline_ledger::LedgerError;
use fundline_types::{AccountType, Amount, MathError, PoolId, ValuationError, ValuationId};
use thiserror::Error;

use crate::holding::HoldingKey;

/// Holdings errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HoldingsError {
    // --- Lifecycle ---
    #[error("holding {key} is already initialized")]
    AlreadyInitialized { key: HoldingKey },

    #[error("holding {key} is not initialized")]
    NotInitialized { key: HoldingKey },

    #[error("holding {key} needs {expected} linked accounts, got {actual}")]
    WrongAccountCount {
        key: HoldingKey,
        expected: usize,
        actual: usize,
    },

    #[error("holding {key} is missing a linked {kind} account")]
    MissingAccountRole { key: HoldingKey, kind: AccountType },

    #[error("valuation '{valuation}' is not registered")]
    UnknownValuation { valuation: ValuationId },

    // --- Position invariants ---
    #[error("insufficient quantity in {key}: available {available}, requested {requested}")]
    InsufficientQuantity {
        key: HoldingKey,
        available: Amount,
        requested: Amount,
    },

    #[error("insufficient value in {key}: carried {available}, requested {requested}")]
    InsufficientValue {
        key: HoldingKey,
        available: Amount,
        requested: Amount,
    },

    #[error("journal scope belongs to {scope_pool}, holding to {holding_pool}")]
    PoolMismatch {
        scope_pool: PoolId,
        holding_pool: PoolId,
    },

    // --- Upstream ---
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, HoldingsError>;
