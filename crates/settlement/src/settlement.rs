use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundline_share_class::ShareClassRegistry;
use fundline_types::{
    checked_add, mul_div, ActorId, Amount, Clock, EpochId, NetworkId, PoolId, Rounding,
    ShareClassId, SystemClock, D18, SCALE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SettlementError};

// ── Conversions ─────────────────────────────────────────────────────

/// `amount · SCALE / price`, rounded down.
pub fn calculate_shares_for_deposit(amount: Amount, price: D18) -> Result<Amount> {
    if price.is_zero() {
        return Err(SettlementError::ZeroPrice);
    }
    let shares = mul_div(amount, SCALE, price.raw(), Rounding::Down)?;
    if shares == 0 {
        return Err(SettlementError::ZeroShares { amount });
    }
    Ok(shares)
}

/// `shares · price / SCALE`, rounded down.
pub fn calculate_assets_for_redeem(shares: Amount, price: D18) -> Result<Amount> {
    if price.is_zero() {
        return Err(SettlementError::ZeroPrice);
    }
    let assets = mul_div(shares, price.raw(), SCALE, Rounding::Down)?;
    if assets == 0 {
        return Err(SettlementError::ZeroAssets { shares });
    }
    Ok(assets)
}

// ── Fulfillments ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositFulfillment {
    pub investor: ActorId,
    /// Network the shares are issued on.
    pub network: NetworkId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemFulfillment {
    pub investor: ActorId,
    /// Network the shares are revoked on.
    pub network: NetworkId,
    pub shares: Amount,
}

/// Converted amount of one fulfillment: assets in and shares out for a
/// deposit, shares in and assets out for a redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentResult {
    pub investor: ActorId,
    pub network: NetworkId,
    /// Assets deposited or shares redeemed.
    pub input: Amount,
    /// Shares issued or assets returned.
    pub output: Amount,
}

/// Convert every deposit at `price` without touching any state.
pub fn preview_deposits(
    price: D18,
    fulfillments: &[DepositFulfillment],
) -> Result<Vec<FulfillmentResult>> {
    if price.is_zero() {
        return Err(SettlementError::ZeroPrice);
    }
    fulfillments
        .iter()
        .enumerate()
        .map(|(index, fill)| {
            let shares = calculate_shares_for_deposit(fill.amount, price).map_err(|source| {
                SettlementError::Fulfillment {
                    index,
                    investor: fill.investor.clone(),
                    source: Box::new(source),
                }
            })?;
            Ok(FulfillmentResult {
                investor: fill.investor.clone(),
                network: fill.network,
                input: fill.amount,
                output: shares,
            })
        })
        .collect()
}

/// Convert every redemption at `price` without touching any state.
pub fn preview_redemptions(
    price: D18,
    fulfillments: &[RedeemFulfillment],
) -> Result<Vec<FulfillmentResult>> {
    if price.is_zero() {
        return Err(SettlementError::ZeroPrice);
    }
    fulfillments
        .iter()
        .enumerate()
        .map(|(index, fill)| {
            let assets = calculate_assets_for_redeem(fill.shares, price).map_err(|source| {
                SettlementError::Fulfillment {
                    index,
                    investor: fill.investor.clone(),
                    source: Box::new(source),
                }
            })?;
            Ok(FulfillmentResult {
                investor: fill.investor.clone(),
                network: fill.network,
                input: fill.shares,
                output: assets,
            })
        })
        .collect()
}

/// Sum of inputs and outputs, and outputs or inputs grouped by network.
fn totals(
    results: &[FulfillmentResult],
    per_network: impl Fn(&FulfillmentResult) -> Amount,
) -> Result<(Amount, Amount, BTreeMap<NetworkId, Amount>)> {
    let mut input = 0;
    let mut output = 0;
    let mut grouped = BTreeMap::new();
    for result in results {
        input = checked_add(input, result.input, "settlement input")?;
        output = checked_add(output, result.output, "settlement output")?;
        let slot: &mut Amount = grouped.entry(result.network).or_default();
        *slot = checked_add(*slot, per_network(result), "network total")?;
    }
    Ok((input, output, grouped))
}

// ── Summaries ───────────────────────────────────────────────────────

/// Cumulative settlement of one share class in one epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub pool: PoolId,
    pub share_class: ShareClassId,
    pub epoch: EpochId,
    /// Deposited value in pool currency.
    pub deposited: Amount,
    pub shares_issued: Amount,
    pub shares_redeemed: Amount,
    /// Redemption payouts in pool currency.
    pub assets_returned: Amount,
    /// Time of the latest batch folded into this summary.
    pub processed_at: DateTime<Utc>,
}

impl BatchSummary {
    fn empty(pool: PoolId, share_class: ShareClassId, epoch: EpochId, at: DateTime<Utc>) -> Self {
        Self {
            pool,
            share_class,
            epoch,
            deposited: 0,
            shares_issued: 0,
            shares_redeemed: 0,
            assets_returned: 0,
            processed_at: at,
        }
    }
}

/// Converted fulfillments and the summary they produce, checked but not
/// yet applied.
struct Staged {
    results: Vec<FulfillmentResult>,
    summary: BatchSummary,
    by_network: BTreeMap<NetworkId, Amount>,
    input: Amount,
    output: Amount,
}

/// Applies epoch fulfillments to share issuance and keeps one summary per
/// (pool, share class, epoch).
///
/// Every fulfillment is converted and every counter checked before the
/// registry is touched, so a rejected batch leaves no partial issuance.
pub struct BatchSettlement {
    summaries: BTreeMap<(PoolId, ShareClassId, EpochId), BatchSummary>,
    clock: Arc<dyn Clock>,
}

impl BatchSettlement {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            summaries: BTreeMap::new(),
            clock,
        }
    }

    /// Check that `fulfillments` would settle without touching any state.
    pub fn check_deposits(
        &self,
        registry: &ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[DepositFulfillment],
    ) -> Result<()> {
        self.stage_deposits(registry, pool, share_class, epoch, price, fulfillments)?;
        Ok(())
    }

    /// Check that `fulfillments` would settle without touching any state.
    pub fn check_redemptions(
        &self,
        registry: &ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[RedeemFulfillment],
    ) -> Result<()> {
        self.stage_redemptions(registry, pool, share_class, epoch, price, fulfillments)?;
        Ok(())
    }

    pub fn process_deposits(
        &mut self,
        registry: &mut ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[DepositFulfillment],
    ) -> Result<Vec<FulfillmentResult>> {
        let Some(staged) =
            self.stage_deposits(registry, pool, share_class, epoch, price, fulfillments)?
        else {
            return Ok(Vec::new());
        };
        for (network, shares) in &staged.by_network {
            registry.update_shares(pool, share_class, *network, *shares, 0)?;
        }
        info!(
            pool = %pool,
            share_class = %share_class,
            epoch = %epoch,
            price = %price,
            fulfillments = staged.results.len(),
            deposited = staged.input,
            issued = staged.output,
            "Deposits settled"
        );
        Ok(self.commit(staged))
    }

    pub fn process_redemptions(
        &mut self,
        registry: &mut ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[RedeemFulfillment],
    ) -> Result<Vec<FulfillmentResult>> {
        let Some(staged) =
            self.stage_redemptions(registry, pool, share_class, epoch, price, fulfillments)?
        else {
            return Ok(Vec::new());
        };
        for (network, shares) in &staged.by_network {
            registry.update_shares(pool, share_class, *network, 0, *shares)?;
        }
        info!(
            pool = %pool,
            share_class = %share_class,
            epoch = %epoch,
            price = %price,
            fulfillments = staged.results.len(),
            redeemed = staged.input,
            returned = staged.output,
            "Redemptions settled"
        );
        Ok(self.commit(staged))
    }

    /// Convert deposits and check every counter they would touch. `None`
    /// for an empty batch.
    fn stage_deposits(
        &self,
        registry: &ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[DepositFulfillment],
    ) -> Result<Option<Staged>> {
        let results = preview_deposits(price, fulfillments)?;
        if results.is_empty() {
            return Ok(None);
        }
        registry.share_class(pool, share_class)?;

        let (deposited, issued, by_network) = totals(&results, |r| r.output)?;
        let mut summary = self.summary_or_empty(pool, share_class, epoch);
        summary.deposited = checked_add(summary.deposited, deposited, "deposited")?;
        summary.shares_issued = checked_add(summary.shares_issued, issued, "shares issued")?;
        for (network, shares) in &by_network {
            let current = registry.issuance(pool, share_class, *network)?;
            checked_add(current.issued, *shares, "issued")?;
        }
        Ok(Some(Staged {
            results,
            summary,
            by_network,
            input: deposited,
            output: issued,
        }))
    }

    fn stage_redemptions(
        &self,
        registry: &ShareClassRegistry,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
        price: D18,
        fulfillments: &[RedeemFulfillment],
    ) -> Result<Option<Staged>> {
        let results = preview_redemptions(price, fulfillments)?;
        if results.is_empty() {
            return Ok(None);
        }
        registry.share_class(pool, share_class)?;

        let (redeemed, returned, by_network) = totals(&results, |r| r.input)?;
        let mut summary = self.summary_or_empty(pool, share_class, epoch);
        summary.shares_redeemed = checked_add(summary.shares_redeemed, redeemed, "shares redeemed")?;
        summary.assets_returned = checked_add(summary.assets_returned, returned, "assets returned")?;
        for (network, shares) in &by_network {
            let current = registry.issuance(pool, share_class, *network)?;
            checked_add(current.revoked, *shares, "revoked")?;
        }
        Ok(Some(Staged {
            results,
            summary,
            by_network,
            input: redeemed,
            output: returned,
        }))
    }

    fn commit(&mut self, staged: Staged) -> Vec<FulfillmentResult> {
        let summary = staged.summary;
        self.summaries
            .insert((summary.pool, summary.share_class, summary.epoch), summary);
        staged.results
    }

    fn summary_or_empty(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
    ) -> BatchSummary {
        let now = self.clock.now();
        match self.summaries.get(&(pool, share_class, epoch)) {
            Some(existing) => {
                debug!(pool = %pool, share_class = %share_class, epoch = %epoch, "Accumulating into existing summary");
                BatchSummary {
                    processed_at: now,
                    ..existing.clone()
                }
            }
            None => BatchSummary::empty(pool, share_class, epoch, now),
        }
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn summary(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
    ) -> Option<&BatchSummary> {
        self.summaries.get(&(pool, share_class, epoch))
    }

    /// Summaries of a share class in epoch order.
    pub fn summaries(&self, pool: PoolId, share_class: ShareClassId) -> Vec<&BatchSummary> {
        self.summaries
            .values()
            .filter(|summary| summary.pool == pool && summary.share_class == share_class)
            .collect()
    }
}

impl Default for BatchSettlement {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
