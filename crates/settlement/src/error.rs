use fundline_share_class::ShareClassError;
use fundline_types::{ActorId, Amount, MathError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("settlement price must be non-zero")]
    ZeroPrice,

    #[error("deposit of {amount} converts to zero shares")]
    ZeroShares { amount: Amount },

    #[error("redemption of {shares} shares converts to zero assets")]
    ZeroAssets { shares: Amount },

    #[error("fulfillment #{index} of {investor} rejected: {source}")]
    Fulfillment {
        index: usize,
        investor: ActorId,
        #[source]
        source: Box<SettlementError>,
    },

    #[error(transparent)]
    ShareClass(#[from] ShareClassError),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
