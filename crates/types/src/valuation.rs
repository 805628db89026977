//! Valuation provider capability.
//!
//! Holdings and the price guard never compute asset prices themselves; they
//! query a provider registered under a [`ValuationId`](crate::ValuationId).
//! Providers return values already normalized to the pool's fixed scale.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::ids::{AssetId, PoolId, ShareClassId};
use crate::math::{Amount, MathError, Rounding, D18};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuationError {
    #[error("asset {asset} is not supported by this valuation")]
    Unsupported { asset: AssetId },

    #[error("no price has been fed for asset {asset}")]
    NoPrice { asset: AssetId },

    #[error(transparent)]
    Math(#[from] MathError),
}

pub trait ValuationProvider: Send + Sync {
    /// Price of one unit of `asset`, in pool currency.
    fn get_price(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        asset: AssetId,
    ) -> Result<D18, ValuationError>;

    /// Value of `base_amount` units of `asset`, in pool currency.
    fn get_quote(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        asset: AssetId,
        base_amount: Amount,
    ) -> Result<Amount, ValuationError> {
        let price = self.get_price(pool, share_class, asset)?;
        Ok(price.mul_amount(base_amount, Rounding::Down)?)
    }

    fn is_supported(&self, pool: PoolId, share_class: ShareClassId, asset: AssetId) -> bool;

    /// When the price for `asset` last changed. `None` if never priced.
    fn last_updated(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        asset: AssetId,
    ) -> Option<DateTime<Utc>>;
}

/// Values every asset 1:1 with the pool currency.
pub struct IdentityValuation {
    clock: Arc<dyn Clock>,
}

impl IdentityValuation {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl ValuationProvider for IdentityValuation {
    fn get_price(&self, _: PoolId, _: ShareClassId, _: AssetId) -> Result<D18, ValuationError> {
        Ok(D18::ONE)
    }

    fn get_quote(
        &self,
        _: PoolId,
        _: ShareClassId,
        _: AssetId,
        base_amount: Amount,
    ) -> Result<Amount, ValuationError> {
        Ok(base_amount)
    }

    fn is_supported(&self, _: PoolId, _: ShareClassId, _: AssetId) -> bool {
        true
    }

    // Identity prices never age.
    fn last_updated(&self, _: PoolId, _: ShareClassId, _: AssetId) -> Option<DateTime<Utc>> {
        Some(self.clock.now())
    }
}

#[derive(Clone, Copy, Debug)]
struct PriceFeed {
    price: D18,
    updated_at: DateTime<Utc>,
}

/// Feeder-driven valuation: one price per asset, stamped when set.
#[derive(Default)]
pub struct OracleValuation {
    feeds: RwLock<HashMap<AssetId, PriceFeed>>,
}

impl OracleValuation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a new price for `asset`.
    pub fn set_price(&self, asset: AssetId, price: D18, updated_at: DateTime<Utc>) {
        debug!(asset = %asset, price = %price, "Oracle price fed");
        self.feeds
            .write()
            .insert(asset, PriceFeed { price, updated_at });
    }

    pub fn price(&self, asset: AssetId) -> Option<D18> {
        self.feeds.read().get(&asset).map(|feed| feed.price)
    }
}

impl ValuationProvider for OracleValuation {
    fn get_price(&self, _: PoolId, _: ShareClassId, asset: AssetId) -> Result<D18, ValuationError> {
        self.price(asset).ok_or(ValuationError::NoPrice { asset })
    }

    fn is_supported(&self, _: PoolId, _: ShareClassId, asset: AssetId) -> bool {
        self.feeds.read().contains_key(&asset)
    }

    fn last_updated(
        &self,
        _: PoolId,
        _: ShareClassId,
        asset: AssetId,
    ) -> Option<DateTime<Utc>> {
        self.feeds.read().get(&asset).map(|feed| feed.updated_at)
    }
}
