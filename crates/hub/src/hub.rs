use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundline_holdings::{Holding, HoldingKey, HoldingsTracker};
use fundline_ledger::{CommitRecord, JournalScope, Ledger};
use fundline_nav::{NavCalculator, NetworkAccountValues};
use fundline_price_guard::{GuardConfig, GuardError, GuardState, PriceCheck, PriceGuard};
use fundline_settlement::{
    preview_deposits, preview_redemptions, BatchSettlement, BatchSummary, DepositFulfillment,
    FulfillmentResult, RedeemFulfillment,
};
use fundline_share_class::{PricePoint, Salt, ShareClassRegistry};
use fundline_types::{
    checked_add, mul_div, ActorId, Amount, AssetId, Clock, EpochId, JournalId, NetworkId, PoolAuthority,
    PoolId, Rounding, ShareClassId, SignedAmount, ValuationId, ValuationProvider, D18,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EpochConfig, HubConfig};
use crate::error::Result;

/// Orders to settle for one share class in one epoch.
///
/// Deposit amounts are units of `asset`; they are settled at their quoted
/// value in pool currency. Redemptions pay out of the same holding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRequest {
    pub pool: PoolId,
    pub share_class: ShareClassId,
    pub epoch: EpochId,
    pub asset: AssetId,
    pub deposits: Vec<DepositFulfillment>,
    pub redemptions: Vec<RedeemFulfillment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revaluation {
    pub holding: HoldingKey,
    pub delta: SignedAmount,
}

/// Outcome of a completed epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub pool: PoolId,
    pub share_class: ShareClassId,
    pub epoch: EpochId,
    pub journal_id: JournalId,
    pub share_price: D18,
    /// Movement from the previous validated price; zero for a baseline.
    pub price_change_bps: u32,
    pub revaluations: Vec<Revaluation>,
    pub deposits: Vec<FulfillmentResult>,
    pub redemptions: Vec<FulfillmentResult>,
    pub summary: Option<BatchSummary>,
    /// Net gain (positive) or loss folded into equity, per network.
    pub closed: Vec<(NetworkId, SignedAmount)>,
    /// Pool NAV across every network after the epoch.
    pub net_asset_value: Amount,
    /// Net value backing `share_class` after the epoch.
    pub share_class_value: Amount,
    pub completed_at: DateTime<Utc>,
}

/// Everything computed inside the epoch's journal scope.
struct EpochPlan {
    price: D18,
    price_check: PriceCheck,
    revaluations: Vec<Revaluation>,
    deposits: Vec<DepositFulfillment>,
    redemptions: Vec<RedeemFulfillment>,
}

struct HubState {
    ledger: Ledger,
    holdings: HoldingsTracker,
    nav: NavCalculator,
    share_classes: ShareClassRegistry,
    guard: PriceGuard,
    settlement: BatchSettlement,
}

/// Single entry point over every component of the engine.
///
/// Each public operation runs as one critical section over the whole state,
/// so no two journal scopes ever interleave.
pub struct PoolHub {
    state: Mutex<HubState>,
    authority: Arc<dyn PoolAuthority>,
    clock: Arc<dyn Clock>,
    epoch_config: EpochConfig,
}

impl PoolHub {
    pub fn new(
        config: &HubConfig,
        authority: Arc<dyn PoolAuthority>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let guard = PriceGuard::new(clock.clone()).with_default_config(config.guard)?;
        let state = HubState {
            ledger: Ledger::new(clock.clone()),
            holdings: HoldingsTracker::new(clock.clone()),
            nav: NavCalculator::new(),
            share_classes: ShareClassRegistry::new(clock.clone()),
            guard,
            settlement: BatchSettlement::new(clock.clone()),
        };
        Ok(Self {
            state: Mutex::new(state),
            authority,
            clock,
            epoch_config: config.epoch,
        })
    }

    // ── Pool setup ──────────────────────────────────────────────────

    pub fn register_valuation(&self, id: ValuationId, provider: Arc<dyn ValuationProvider>) {
        self.state.lock().holdings.register_valuation(id, provider);
    }

    pub fn initialize_network(&self, pool: PoolId, network: NetworkId) -> Result<()> {
        let mut state = self.state.lock();
        let HubState { ledger, nav, .. } = &mut *state;
        nav.initialize_network(ledger, pool, network)?;
        Ok(())
    }

    pub fn initialize_holding(&self, key: HoldingKey, valuation: Option<ValuationId>) -> Result<()> {
        let mut state = self.state.lock();
        let HubState {
            ledger,
            holdings,
            nav,
            ..
        } = &mut *state;
        nav.initialize_holding(ledger, holdings, key, valuation)?;
        Ok(())
    }

    pub fn initialize_liability(
        &self,
        key: HoldingKey,
        valuation: Option<ValuationId>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let HubState {
            ledger,
            holdings,
            nav,
            ..
        } = &mut *state;
        nav.initialize_liability(ledger, holdings, key, valuation)?;
        Ok(())
    }

    pub fn add_share_class(
        &self,
        pool: PoolId,
        name: &str,
        symbol: &str,
        salt: Salt,
    ) -> Result<ShareClassId> {
        Ok(self
            .state
            .lock()
            .share_classes
            .add_share_class(pool, name, symbol, salt)?)
    }

    pub fn update_share_class_metadata(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        name: &str,
        symbol: &str,
        salt: Salt,
    ) -> Result<()> {
        self.state
            .lock()
            .share_classes
            .update_metadata(pool, share_class, name, symbol, salt)?;
        Ok(())
    }

    /// Record that every holding of `share_class` on `network` has been
    /// synced up to `nonce`.
    pub fn set_snapshot(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        network: NetworkId,
        is_snapshot: bool,
        nonce: u64,
    ) {
        self.state
            .lock()
            .holdings
            .set_snapshot(pool, share_class, network, is_snapshot, nonce);
    }

    // ── Guard controls ──────────────────────────────────────────────

    pub fn configure_guard(&self, pool: PoolId, caller: &ActorId, config: GuardConfig) -> Result<()> {
        self.state
            .lock()
            .guard
            .configure_guard(self.authority.as_ref(), pool, caller, config)?;
        Ok(())
    }

    pub fn pause(&self, pool: PoolId, caller: &ActorId, reason: &str) -> Result<()> {
        self.state
            .lock()
            .guard
            .pause(self.authority.as_ref(), pool, caller, reason)?;
        Ok(())
    }

    pub fn unpause(&self, pool: PoolId, caller: &ActorId) -> Result<()> {
        self.state
            .lock()
            .guard
            .unpause(self.authority.as_ref(), pool, caller)?;
        Ok(())
    }

    // ── Realization ─────────────────────────────────────────────────

    pub fn close_gain_loss(&self, pool: PoolId, network: NetworkId) -> Result<SignedAmount> {
        let mut state = self.state.lock();
        let HubState { ledger, nav, .. } = &mut *state;
        Ok(nav.close_gain_loss(ledger, pool, network)?)
    }

    // ── Epoch ───────────────────────────────────────────────────────

    /// Revalue, price and settle one share class.
    ///
    /// Every ledger posting of the epoch lands in one journal batch. If
    /// anything fails before that batch commits, the batch is aborted and
    /// holdings are restored, leaving every component as it was.
    ///
    /// Price storage, guard recording, issuance and summaries are applied
    /// after the commit; their checks all run inside the batch. With
    /// `close_gain_loss` set, each network is closed in a batch of its own
    /// afterwards. An error there leaves the epoch committed and the
    /// remaining networks unclosed.
    pub fn run_epoch(&self, request: &EpochRequest) -> Result<EpochReport> {
        let mut state = self.state.lock();
        let pool = request.pool;
        let share_class = request.share_class;

        if state.guard.is_paused(pool) {
            warn!(pool = %pool, epoch = %request.epoch, "Epoch refused: pool paused");
            return Err(GuardError::Paused { pool }.into());
        }
        state.share_classes.share_class(pool, share_class)?;
        state
            .holdings
            .holding(HoldingKey::new(pool, share_class, request.asset))?;
        if self.epoch_config.require_fresh_valuations {
            state.require_fresh_valuations(pool, share_class)?;
        }

        let checkpoint = state.holdings.checkpoint();
        let scope = state.ledger.open_batch(pool)?;
        let now = self.clock.now();
        let planned = state.plan_epoch(&scope, request, &self.epoch_config, now);
        let (plan, commit) = match planned {
            Ok(plan) => match state.ledger.commit_batch(scope) {
                Ok(commit) => (plan, commit),
                Err(err) => {
                    // The ledger reverts an unbalanced batch on its own.
                    state.holdings.restore(checkpoint);
                    return Err(err.into());
                }
            },
            Err(err) => {
                warn!(pool = %pool, epoch = %request.epoch, error = %err, "Epoch rolled back");
                if let Err(abort_err) = state.ledger.abort_batch(scope) {
                    warn!(pool = %pool, error = %abort_err, "Journal abort failed");
                }
                state.holdings.restore(checkpoint);
                return Err(err);
            }
        };

        let report = state.finish_epoch(request, plan, commit, now, &self.epoch_config)?;
        info!(
            pool = %pool,
            share_class = %share_class,
            epoch = %request.epoch,
            journal_id = report.journal_id.0,
            share_price = %report.share_price,
            nav = report.net_asset_value,
            "Epoch completed"
        );
        Ok(report)
    }

    // ── Readers ─────────────────────────────────────────────────────

    /// Net value of the share class's holdings per outstanding share; 1.0
    /// while nothing is outstanding.
    pub fn share_price(&self, pool: PoolId, share_class: ShareClassId) -> Result<D18> {
        self.state.lock().share_price(pool, share_class)
    }

    /// Asset holdings less liability holdings of one share class, floored at
    /// zero.
    pub fn share_class_value(&self, pool: PoolId, share_class: ShareClassId) -> Result<Amount> {
        self.state.lock().share_class_value(pool, share_class)
    }

    pub fn net_asset_value(&self, pool: PoolId, network: NetworkId) -> Result<Amount> {
        let state = self.state.lock();
        Ok(state.nav.net_asset_value(&state.ledger, pool, network)?)
    }

    pub fn pool_net_asset_value(&self, pool: PoolId) -> Result<Amount> {
        let state = self.state.lock();
        Ok(state.nav.pool_net_asset_value(&state.ledger, pool)?)
    }

    pub fn account_values(&self, pool: PoolId, network: NetworkId) -> Result<NetworkAccountValues> {
        let state = self.state.lock();
        Ok(state.nav.get_account_values(&state.ledger, pool, network)?)
    }

    pub fn holding(&self, key: HoldingKey) -> Result<Holding> {
        Ok(self.state.lock().holdings.holding(key)?.clone())
    }

    pub fn total_issuance(&self, pool: PoolId, share_class: ShareClassId) -> Result<Amount> {
        Ok(self.state.lock().share_classes.total_issuance(pool, share_class)?)
    }

    pub fn price_per_share(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
    ) -> Result<Option<PricePoint>> {
        Ok(self.state.lock().share_classes.price_per_share(pool, share_class)?)
    }

    pub fn guard_state(&self, pool: PoolId) -> GuardState {
        self.state.lock().guard.state(pool)
    }

    pub fn last_validated_price(&self, pool: PoolId, share_class: ShareClassId) -> Option<D18> {
        self.state.lock().guard.last_validated_price(pool, share_class)
    }

    pub fn batch_summary(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        epoch: EpochId,
    ) -> Option<BatchSummary> {
        self.state
            .lock()
            .settlement
            .summary(pool, share_class, epoch)
            .cloned()
    }

    pub fn journal(&self, pool: PoolId) -> Vec<CommitRecord> {
        self.state.lock().ledger.journal(pool).to_vec()
    }

    pub fn is_batch_open(&self) -> bool {
        self.state.lock().ledger.is_batch_open()
    }
}

impl HubState {
    fn share_price(&self, pool: PoolId, share_class: ShareClassId) -> Result<D18> {
        let issuance = self.share_classes.total_issuance(pool, share_class)?;
        if issuance == 0 {
            return Ok(D18::ONE);
        }
        let value = self.share_class_value(pool, share_class)?;
        Ok(D18::from_ratio(value, issuance)?)
    }

    fn share_class_value(&self, pool: PoolId, share_class: ShareClassId) -> Result<Amount> {
        self.share_classes.share_class(pool, share_class)?;
        let mut net = SignedAmount::ZERO;
        for (_, holding) in self.holdings.holdings_of(pool, share_class) {
            let value = SignedAmount::positive(holding.value);
            net = if holding.is_liability {
                net.checked_sub(value)?
            } else {
                net.checked_add(value)?
            };
        }
        Ok(net.floor_zero())
    }

    fn require_fresh_valuations(&self, pool: PoolId, share_class: ShareClassId) -> Result<()> {
        for (key, holding) in self.holdings.holdings_of(pool, share_class) {
            let Some(id) = &holding.valuation else {
                continue;
            };
            if let Some(provider) = self.holdings.valuation_provider(id) {
                self.guard
                    .require_fresh_valuation(provider.as_ref(), pool, share_class, key.asset)?;
            }
        }
        Ok(())
    }

    /// Post every movement of the epoch into `scope` and check that the
    /// resulting price and settlement may be applied. Touches only the
    /// ledger and holdings.
    fn plan_epoch(
        &mut self,
        scope: &JournalScope,
        request: &EpochRequest,
        config: &EpochConfig,
        now: DateTime<Utc>,
    ) -> Result<EpochPlan> {
        let pool = request.pool;
        let share_class = request.share_class;

        let mut revaluations = Vec::new();
        if config.revalue_holdings {
            let keys: Vec<HoldingKey> = self
                .holdings
                .holdings_of(pool, share_class)
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            for key in keys {
                let delta = self.holdings.update(&mut self.ledger, scope, key)?;
                if !delta.is_zero() {
                    revaluations.push(Revaluation { holding: key, delta });
                }
            }
        }

        let price = self.share_price(pool, share_class)?;
        let price_check = self.guard.check_price(pool, share_class, price)?;
        self.share_classes
            .check_price_update(pool, share_class, now)?;
        debug!(pool = %pool, share_class = %share_class, price = %price, "Epoch price computed");

        let key = HoldingKey::new(pool, share_class, request.asset);
        let deposits = self.post_deposits(scope, key, price, &request.deposits)?;
        self.post_redemptions(scope, key, price, &request.redemptions)?;
        self.settlement.check_deposits(
            &self.share_classes,
            pool,
            share_class,
            request.epoch,
            price,
            &deposits,
        )?;
        self.settlement.check_redemptions(
            &self.share_classes,
            pool,
            share_class,
            request.epoch,
            price,
            &request.redemptions,
        )?;

        Ok(EpochPlan {
            price,
            price_check,
            revaluations,
            deposits,
            redemptions: request.redemptions.clone(),
        })
    }

    /// Increase the holding by the deposited units. Returns the deposits
    /// restated at their quoted value.
    fn post_deposits(
        &mut self,
        scope: &JournalScope,
        key: HoldingKey,
        price: D18,
        deposits: &[DepositFulfillment],
    ) -> Result<Vec<DepositFulfillment>> {
        let mut valued = Vec::with_capacity(deposits.len());
        let mut quantity: Amount = 0;
        let mut value: Amount = 0;
        for deposit in deposits {
            let quoted = self.holdings.quote(key, deposit.amount)?;
            quantity = checked_add(quantity, deposit.amount, "deposit quantity")?;
            value = checked_add(value, quoted, "deposit value")?;
            valued.push(DepositFulfillment {
                amount: quoted,
                ..deposit.clone()
            });
        }
        // Dust orders fail here, before anything is posted.
        preview_deposits(price, &valued)?;
        if quantity > 0 {
            self.holdings
                .increase(&mut self.ledger, scope, key, quantity, value)?;
        }
        Ok(valued)
    }

    /// Decrease the holding by the assets paid out. Units leave in
    /// proportion to the holding's current value.
    fn post_redemptions(
        &mut self,
        scope: &JournalScope,
        key: HoldingKey,
        price: D18,
        redemptions: &[RedeemFulfillment],
    ) -> Result<()> {
        let results = preview_redemptions(price, redemptions)?;
        let mut value: Amount = 0;
        for result in &results {
            value = checked_add(value, result.output, "redemption value")?;
        }
        if value == 0 {
            return Ok(());
        }

        let holding = self.holdings.holding(key)?;
        let quantity = if holding.value == 0 {
            value
        } else {
            mul_div(value, holding.quantity, holding.value, Rounding::Up)?.min(holding.quantity)
        };
        self.holdings
            .decrease(&mut self.ledger, scope, key, quantity, value)?;
        Ok(())
    }

    /// Apply the committed epoch to pricing, the guard and issuance.
    fn finish_epoch(
        &mut self,
        request: &EpochRequest,
        plan: EpochPlan,
        commit: CommitRecord,
        now: DateTime<Utc>,
        config: &EpochConfig,
    ) -> Result<EpochReport> {
        let pool = request.pool;
        let share_class = request.share_class;

        self.share_classes
            .update_share_price(pool, share_class, plan.price, now)?;
        self.guard.validate_price(pool, share_class, plan.price)?;

        let deposits = self.settlement.process_deposits(
            &mut self.share_classes,
            pool,
            share_class,
            request.epoch,
            plan.price,
            &plan.deposits,
        )?;
        let redemptions = self.settlement.process_redemptions(
            &mut self.share_classes,
            pool,
            share_class,
            request.epoch,
            plan.price,
            &plan.redemptions,
        )?;

        let mut closed = Vec::new();
        if config.close_gain_loss {
            let networks: Vec<NetworkId> = self.nav.networks(pool).collect();
            for network in networks {
                let net = self.nav.close_gain_loss(&mut self.ledger, pool, network)?;
                closed.push((network, net));
            }
        }

        Ok(EpochReport {
            pool,
            share_class,
            epoch: request.epoch,
            journal_id: commit.journal_id,
            share_price: plan.price,
            price_change_bps: plan.price_check.change_bps(),
            revaluations: plan.revaluations,
            deposits,
            redemptions,
            summary: self
                .settlement
                .summary(pool, share_class, request.epoch)
                .cloned(),
            closed,
            net_asset_value: self.nav.pool_net_asset_value(&self.ledger, pool)?,
            share_class_value: self.share_class_value(pool, share_class)?,
            completed_at: now,
        })
    }
}
