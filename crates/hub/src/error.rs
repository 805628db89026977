use fundline_holdings::HoldingsError;
use fundline_ledger::LedgerError;
use fundline_nav::NavError;
use fundline_price_guard::GuardError;
use fundline_settlement::SettlementError;
use fundline_share_class::ShareClassError;
use fundline_types::{MathError, ValuationError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum HubError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Holdings(#[from] HoldingsError),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    ShareClass(#[from] ShareClassError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, HubError>;
