use fundline_holdings::HoldingsError;
use fundline_ledger::LedgerError;
use fundline_types::{MathError, NetworkId, PoolId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("{network} is already initialized for {pool}")]
    NetworkAlreadyInitialized { pool: PoolId, network: NetworkId },

    #[error("{network} is not initialized for {pool}")]
    NetworkNotInitialized { pool: PoolId, network: NetworkId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Holdings(#[from] HoldingsError),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, NavError>;
