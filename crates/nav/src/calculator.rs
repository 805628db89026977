use std::collections::BTreeSet;

use fundline_holdings::{HoldingAccount, HoldingKey, HoldingsError, HoldingsTracker};
use fundline_ledger::{JournalScope, Ledger};
use fundline_types::{AccountType, Amount, NetworkId, PoolId, SignedAmount, ValuationId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accounts::{
    asset_account, equity_account, expense_account, gain_account, liability_account,
    loss_account, network_accounts,
};
use crate::error::{NavError, Result};

/// Oriented balances of a network's four buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAccountValues {
    pub equity: SignedAmount,
    pub gain: SignedAmount,
    pub loss: SignedAmount,
    pub liability: SignedAmount,
}

impl NetworkAccountValues {
    /// `Equity + Gain − Loss − Liability`, clamped at zero.
    ///
    /// Losses are booked as debits on a credit-normal account, so a loss of
    /// `x` reads as `(false, x)`; adding the signed value subtracts it.
    pub fn net_asset_value(&self) -> Result<Amount> {
        let nav = self
            .equity
            .checked_add(self.gain)?
            .checked_add(self.loss)?
            .checked_sub(self.liability)?;
        Ok(nav.floor_zero())
    }
}

/// Computes NAV per (pool, network) from ledger balances and wires holdings
/// to their deterministically derived accounts.
#[derive(Debug, Default)]
pub struct NavCalculator {
    networks: BTreeSet<(PoolId, NetworkId)>,
}

impl NavCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Initialization ──────────────────────────────────────────────

    /// Create the Equity, Gain, Loss and Liability accounts of `network`.
    pub fn initialize_network(
        &mut self,
        ledger: &mut Ledger,
        pool: PoolId,
        network: NetworkId,
    ) -> Result<()> {
        if self.networks.contains(&(pool, network)) {
            return Err(NavError::NetworkAlreadyInitialized { pool, network });
        }
        let accounts = network_accounts(network);
        if let Some((account, _)) = accounts
            .iter()
            .find(|(id, _)| ledger.account_exists(pool, *id))
        {
            return Err(fundline_ledger::LedgerError::AccountExists {
                pool,
                account: *account,
            }
            .into());
        }
        for (id, kind) in accounts {
            ledger.create_account(pool, id, kind)?;
        }
        self.networks.insert((pool, network));
        info!(pool = %pool, network = %network, "Network initialized");
        Ok(())
    }

    /// Track an asset holding on the asset's network. Creates the asset
    /// account on first use and links it with the network's Equity, Gain
    /// and Loss accounts.
    pub fn initialize_holding(
        &self,
        ledger: &mut Ledger,
        holdings: &mut HoldingsTracker,
        key: HoldingKey,
        valuation: Option<ValuationId>,
    ) -> Result<()> {
        let network = self.holding_network(holdings, key)?;
        let asset = asset_account(key.asset);
        let accounts = [
            HoldingAccount::new(asset, AccountType::Asset),
            HoldingAccount::new(equity_account(network), AccountType::Equity),
            HoldingAccount::new(gain_account(network), AccountType::Gain),
            HoldingAccount::new(loss_account(network), AccountType::Loss),
        ];
        if let Some(id) = &valuation {
            if holdings.valuation_provider(id).is_none() {
                return Err(HoldingsError::UnknownValuation {
                    valuation: id.clone(),
                }
                .into());
            }
        }
        if !ledger.account_exists(key.pool, asset) {
            ledger.create_account(key.pool, asset, AccountType::Asset)?;
        }
        holdings.initialize(key, valuation, false, &accounts)?;
        Ok(())
    }

    /// Track a liability holding: asset-derived Expense account plus the
    /// network's Liability account.
    pub fn initialize_liability(
        &self,
        ledger: &mut Ledger,
        holdings: &mut HoldingsTracker,
        key: HoldingKey,
        valuation: Option<ValuationId>,
    ) -> Result<()> {
        let network = self.holding_network(holdings, key)?;
        let expense = expense_account(key.asset);
        let accounts = [
            HoldingAccount::new(expense, AccountType::Expense),
            HoldingAccount::new(liability_account(network), AccountType::Liability),
        ];
        if let Some(id) = &valuation {
            if holdings.valuation_provider(id).is_none() {
                return Err(HoldingsError::UnknownValuation {
                    valuation: id.clone(),
                }
                .into());
            }
        }
        if !ledger.account_exists(key.pool, expense) {
            ledger.create_account(key.pool, expense, AccountType::Expense)?;
        }
        holdings.initialize(key, valuation, true, &accounts)?;
        Ok(())
    }

    fn holding_network(&self, holdings: &HoldingsTracker, key: HoldingKey) -> Result<NetworkId> {
        let network = key.asset.network();
        self.require_network(key.pool, network)?;
        if holdings.is_initialized(key) {
            return Err(HoldingsError::AlreadyInitialized { key }.into());
        }
        Ok(network)
    }

    // ── Realization ─────────────────────────────────────────────────

    /// Fold unrealized gain/loss of `network` into equity.
    ///
    /// Runs in its own journal batch: zeroes Gain and Loss with offsetting
    /// postings and books the net into Equity. Returns the net amount moved.
    pub fn close_gain_loss(
        &self,
        ledger: &mut Ledger,
        pool: PoolId,
        network: NetworkId,
    ) -> Result<SignedAmount> {
        self.require_network(pool, network)?;
        let scope = ledger.open_batch(pool)?;
        match self.post_gain_loss_close(ledger, &scope, pool, network) {
            Ok(net) => {
                ledger.commit_batch(scope)?;
                info!(pool = %pool, network = %network, net = %net, "Gain/loss closed into equity");
                Ok(net)
            }
            Err(err) => {
                ledger.abort_batch(scope)?;
                Err(err)
            }
        }
    }

    fn post_gain_loss_close(
        &self,
        ledger: &mut Ledger,
        scope: &JournalScope,
        pool: PoolId,
        network: NetworkId,
    ) -> Result<SignedAmount> {
        let gain_id = gain_account(network);
        let loss_id = loss_account(network);
        let gain = ledger.account_value(pool, gain_id)?;
        let loss = ledger.account_value(pool, loss_id)?;

        // Both are credit-normal: a positive balance is cleared by a debit.
        for (id, value) in [(gain_id, gain), (loss_id, loss)] {
            if value.is_positive {
                ledger.post_debit(scope, id, value.magnitude)?;
            } else {
                ledger.post_credit(scope, id, value.magnitude)?;
            }
        }

        let net = gain.checked_add(loss)?;
        let equity = equity_account(network);
        if net.is_positive {
            ledger.post_credit(scope, equity, net.magnitude)?;
        } else {
            ledger.post_debit(scope, equity, net.magnitude)?;
        }
        Ok(net)
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn get_account_values(
        &self,
        ledger: &Ledger,
        pool: PoolId,
        network: NetworkId,
    ) -> Result<NetworkAccountValues> {
        self.require_network(pool, network)?;
        Ok(NetworkAccountValues {
            equity: ledger.account_value(pool, equity_account(network))?,
            gain: ledger.account_value(pool, gain_account(network))?,
            loss: ledger.account_value(pool, loss_account(network))?,
            liability: ledger.account_value(pool, liability_account(network))?,
        })
    }

    /// NAV of one network slice; zero means technically insolvent.
    pub fn net_asset_value(&self, ledger: &Ledger, pool: PoolId, network: NetworkId) -> Result<Amount> {
        let values = self.get_account_values(ledger, pool, network)?;
        let nav = values.net_asset_value()?;
        debug!(pool = %pool, network = %network, nav, "Net asset value computed");
        Ok(nav)
    }

    /// Sum of NAV over every initialized network of `pool`.
    pub fn pool_net_asset_value(&self, ledger: &Ledger, pool: PoolId) -> Result<Amount> {
        self.networks(pool).try_fold(0u128, |total, network| {
            let nav = self.net_asset_value(ledger, pool, network)?;
            Ok(fundline_types::checked_add(total, nav, "pool_nav")?)
        })
    }

    pub fn is_network_initialized(&self, pool: PoolId, network: NetworkId) -> bool {
        self.networks.contains(&(pool, network))
    }

    pub fn networks(&self, pool: PoolId) -> impl Iterator<Item = NetworkId> + '_ {
        self.networks
            .range((pool, NetworkId(0))..=(pool, NetworkId(u16::MAX)))
            .map(|(_, network)| *network)
    }

    fn require_network(&self, pool: PoolId, network: NetworkId) -> Result<()> {
        if !self.is_network_initialized(pool, network) {
            return Err(NavError::NetworkNotInitialized { pool, network });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fundline_ledger::LedgerError;
    use fundline_types::{AssetId, ManualClock, OracleValuation, ShareClassId, D18, SCALE};
    use std::sync::Arc;

    const POOL: PoolId = PoolId(1);
    const NET: NetworkId = NetworkId(1);

    struct Fixture {
        ledger: Ledger,
        holdings: HoldingsTracker,
        nav: NavCalculator,
        oracle: Arc<OracleValuation>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut ledger = Ledger::new(clock.clone());
        let mut holdings = HoldingsTracker::new(clock);
        let oracle = Arc::new(OracleValuation::new());
        holdings.register_valuation(ValuationId::new("oracle"), oracle.clone());
        let mut nav = NavCalculator::new();
        nav.initialize_network(&mut ledger, POOL, NET).unwrap();
        Fixture {
            ledger,
            holdings,
            nav,
            oracle,
        }
    }

    fn key(counter: u64) -> HoldingKey {
        HoldingKey::new(POOL, ShareClassId::derive(POOL, 1), AssetId::new(NET, counter))
    }

    /// Post a balanced pair directly against the network buckets.
    fn book(f: &mut Fixture, debit: fundline_types::AccountId, credit: fundline_types::AccountId, amount: Amount) {
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.ledger.post_debit(&scope, debit, amount).unwrap();
        f.ledger.post_credit(&scope, credit, amount).unwrap();
        f.ledger.commit_batch(scope).unwrap();
    }

    #[test]
    fn nav_formula() {
        let values = NetworkAccountValues {
            equity: SignedAmount::positive(100_000),
            gain: SignedAmount::positive(5_000),
            loss: SignedAmount::negative(1_000),
            liability: SignedAmount::positive(2_000),
        };
        assert_eq!(values.net_asset_value().unwrap(), 102_000);
    }

    #[test]
    fn nav_clamps_to_zero() {
        let values = NetworkAccountValues {
            equity: SignedAmount::positive(1_000),
            gain: SignedAmount::ZERO,
            loss: SignedAmount::negative(200),
            liability: SignedAmount::positive(5_000),
        };
        assert_eq!(values.net_asset_value().unwrap(), 0);
    }

    #[test]
    fn network_initialization_is_once_only() {
        let mut f = fixture();
        let err = f.nav.initialize_network(&mut f.ledger, POOL, NET).unwrap_err();
        assert_eq!(
            err,
            NavError::NetworkAlreadyInitialized {
                pool: POOL,
                network: NET
            }
        );
        for (id, kind) in network_accounts(NET) {
            assert_eq!(f.ledger.account(POOL, id).unwrap().kind, kind);
        }
        assert!(f.nav.is_network_initialized(POOL, NET));
        assert!(!f.nav.is_network_initialized(PoolId(2), NET));
    }

    #[test]
    fn readers_require_initialized_network() {
        let f = fixture();
        let err = f
            .nav
            .net_asset_value(&f.ledger, POOL, NetworkId(9))
            .unwrap_err();
        assert_eq!(
            err,
            NavError::NetworkNotInitialized {
                pool: POOL,
                network: NetworkId(9)
            }
        );
    }

    #[test]
    fn holdings_need_their_network() {
        let mut f = fixture();
        let foreign = HoldingKey::new(POOL, ShareClassId::derive(POOL, 1), AssetId::new(NetworkId(4), 1));
        let err = f
            .nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, foreign, None)
            .unwrap_err();
        assert!(matches!(err, NavError::NetworkNotInitialized { .. }));
    }

    #[test]
    fn holding_postings_feed_nav() {
        let mut f = fixture();
        let asset = key(1);
        let debt = key(2);
        f.nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, asset, None)
            .unwrap();
        f.nav
            .initialize_liability(&mut f.ledger, &mut f.holdings, debt, None)
            .unwrap();

        let scope = f.ledger.open_batch(POOL).unwrap();
        f.holdings
            .increase(&mut f.ledger, &scope, asset, 100_000, 100_000)
            .unwrap();
        f.holdings
            .increase(&mut f.ledger, &scope, debt, 2_000, 2_000)
            .unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(f.nav.net_asset_value(&f.ledger, POOL, NET).unwrap(), 98_000);
        assert_eq!(f.nav.pool_net_asset_value(&f.ledger, POOL).unwrap(), 98_000);
    }

    #[test]
    fn shared_asset_account_across_share_classes() {
        let mut f = fixture();
        let first = key(1);
        let second = HoldingKey::new(POOL, ShareClassId::derive(POOL, 2), first.asset);
        f.nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, first, None)
            .unwrap();
        f.nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, second, None)
            .unwrap();
        assert_eq!(
            f.holdings.account_id(first, AccountType::Asset).unwrap(),
            f.holdings.account_id(second, AccountType::Asset).unwrap()
        );
    }

    #[test]
    fn revaluation_then_close_moves_gain_into_equity() {
        let mut f = fixture();
        let asset = key(1);
        f.nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, asset, Some(ValuationId::new("oracle")))
            .unwrap();
        f.oracle.set_price(asset.asset, D18::ONE, Utc::now());

        let scope = f.ledger.open_batch(POOL).unwrap();
        f.holdings
            .increase(&mut f.ledger, &scope, asset, 1_000, 1_000)
            .unwrap();
        f.ledger.commit_batch(scope).unwrap();

        f.oracle.set_price(asset.asset, D18(3 * SCALE / 2), Utc::now());
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.holdings.update(&mut f.ledger, &scope, asset).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        let before = f.nav.get_account_values(&f.ledger, POOL, NET).unwrap();
        assert_eq!(before.gain, SignedAmount::positive(500));
        assert_eq!(before.equity, SignedAmount::positive(1_000));
        assert_eq!(f.nav.net_asset_value(&f.ledger, POOL, NET).unwrap(), 1_500);

        let net = f.nav.close_gain_loss(&mut f.ledger, POOL, NET).unwrap();
        assert_eq!(net, SignedAmount::positive(500));

        let after = f.nav.get_account_values(&f.ledger, POOL, NET).unwrap();
        assert_eq!(after.equity, SignedAmount::positive(1_500));
        assert!(after.gain.is_zero());
        assert!(after.loss.is_zero());
        assert_eq!(f.nav.net_asset_value(&f.ledger, POOL, NET).unwrap(), 1_500);
    }

    #[test]
    fn close_nets_gain_against_loss() {
        let mut f = fixture();
        let asset = key(1);
        f.nav
            .initialize_holding(&mut f.ledger, &mut f.holdings, asset, None)
            .unwrap();
        let asset_id = asset_account(asset.asset);
        book(&mut f, asset_id, equity_account(NET), 10_000);
        book(&mut f, asset_id, gain_account(NET), 300);
        book(&mut f, loss_account(NET), asset_id, 800);

        let net = f.nav.close_gain_loss(&mut f.ledger, POOL, NET).unwrap();
        assert_eq!(net, SignedAmount::negative(500));

        let after = f.nav.get_account_values(&f.ledger, POOL, NET).unwrap();
        assert_eq!(after.equity, SignedAmount::positive(9_500));
        assert!(after.gain.is_zero());
        assert!(after.loss.is_zero());
    }

    #[test]
    fn close_fails_while_a_batch_is_open() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        let err = f.nav.close_gain_loss(&mut f.ledger, POOL, NET).unwrap_err();
        assert!(matches!(
            err,
            NavError::Ledger(LedgerError::BatchAlreadyOpen { .. })
        ));
        f.ledger.abort_batch(scope).unwrap();
    }
}
