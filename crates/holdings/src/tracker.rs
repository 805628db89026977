use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fundline_ledger::{JournalScope, Ledger};
use fundline_types::{
    checked_add, AccountId, AccountType, Amount, Clock, NetworkId, PoolId, ShareClassId,
    SignedAmount, SystemClock, ValuationId, ValuationProvider,
};
use tracing::{debug, info};

use crate::error::{HoldingsError, Result};
use crate::holding::{Holding, HoldingAccount, HoldingKey, HoldingSnapshot};

/// Saved holdings state, restored when an orchestrated unit of work aborts.
#[derive(Clone, Debug)]
pub struct HoldingsCheckpoint {
    holdings: HashMap<HoldingKey, Holding>,
}

/// Owns every (pool, share class, asset) position and translates position
/// changes into paired ledger postings on the holding's linked accounts.
///
/// | movement            | asset holding            | liability holding             |
/// |---------------------|--------------------------|-------------------------------|
/// | increase            | Dr Asset / Cr Equity     | Dr Expense / Cr Liability     |
/// | decrease            | Dr Equity / Cr Asset     | Dr Liability / Cr Expense     |
/// | revaluation upward  | Dr Asset / Cr Gain       | Dr Expense / Cr Liability     |
/// | revaluation downward| Dr Loss / Cr Asset       | Dr Liability / Cr Expense     |
pub struct HoldingsTracker {
    holdings: HashMap<HoldingKey, Holding>,
    valuations: HashMap<ValuationId, Arc<dyn ValuationProvider>>,
    snapshots: HashMap<(PoolId, ShareClassId, NetworkId), HoldingSnapshot>,
    clock: Arc<dyn Clock>,
}

impl HoldingsTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            holdings: HashMap::new(),
            valuations: HashMap::new(),
            snapshots: HashMap::new(),
            clock,
        }
    }

    // ── Valuation registry ──────────────────────────────────────────

    /// Make a valuation provider resolvable under `id`.
    pub fn register_valuation(&mut self, id: ValuationId, provider: Arc<dyn ValuationProvider>) {
        debug!(valuation = %id, "Valuation registered");
        self.valuations.insert(id, provider);
    }

    pub fn valuation_provider(&self, id: &ValuationId) -> Option<Arc<dyn ValuationProvider>> {
        self.valuations.get(id).cloned()
    }

    fn resolve_valuation(&self, id: &ValuationId) -> Result<Arc<dyn ValuationProvider>> {
        self.valuation_provider(id)
            .ok_or_else(|| HoldingsError::UnknownValuation {
                valuation: id.clone(),
            })
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub fn initialize(
        &mut self,
        key: HoldingKey,
        valuation: Option<ValuationId>,
        is_liability: bool,
        accounts: &[HoldingAccount],
    ) -> Result<()> {
        if self.holdings.contains_key(&key) {
            return Err(HoldingsError::AlreadyInitialized { key });
        }
        if let Some(id) = &valuation {
            self.resolve_valuation(id)?;
        }

        let mut holding = Holding {
            quantity: 0,
            value: 0,
            valuation,
            is_liability,
            accounts: BTreeMap::new(),
            created_at: self.clock.now(),
        };
        let roles = holding.roles();
        if accounts.len() != roles.len() {
            return Err(HoldingsError::WrongAccountCount {
                key,
                expected: roles.len(),
                actual: accounts.len(),
            });
        }
        for account in accounts {
            holding.accounts.insert(account.kind, account.id);
        }
        if let Some(kind) = roles.iter().find(|kind| !holding.accounts.contains_key(*kind)) {
            return Err(HoldingsError::MissingAccountRole { key, kind: *kind });
        }

        info!(
            holding = %key,
            is_liability,
            valuation = ?holding.valuation,
            "Holding initialized"
        );
        self.holdings.insert(key, holding);
        Ok(())
    }

    /// Point the holding at another registered valuation provider.
    pub fn update_valuation(&mut self, key: HoldingKey, valuation: ValuationId) -> Result<()> {
        self.resolve_valuation(&valuation)?;
        let holding = self.holding_mut(key)?;
        debug!(holding = %key, valuation = %valuation, "Holding valuation updated");
        holding.valuation = Some(valuation);
        Ok(())
    }

    // ── Movements ───────────────────────────────────────────────────

    /// Add `amount` units worth `value` to the position.
    pub fn increase(
        &mut self,
        ledger: &mut Ledger,
        scope: &JournalScope,
        key: HoldingKey,
        amount: Amount,
        value: Amount,
    ) -> Result<()> {
        check_pool(scope, key)?;
        let holding = self.holding(key)?;
        let quantity = checked_add(holding.quantity, amount, "holding_quantity")?;
        let new_value = checked_add(holding.value, value, "holding_value")?;
        let (debit, credit) = if holding.is_liability {
            (
                role(holding, key, AccountType::Expense)?,
                role(holding, key, AccountType::Liability)?,
            )
        } else {
            (
                role(holding, key, AccountType::Asset)?,
                role(holding, key, AccountType::Equity)?,
            )
        };

        post_pair(ledger, scope, debit, credit, value)?;

        let holding = self.holding_mut(key)?;
        holding.quantity = quantity;
        holding.value = new_value;
        debug!(holding = %key, amount, value, "Holding increased");
        Ok(())
    }

    /// Remove `amount` units worth `value` from the position.
    pub fn decrease(
        &mut self,
        ledger: &mut Ledger,
        scope: &JournalScope,
        key: HoldingKey,
        amount: Amount,
        value: Amount,
    ) -> Result<()> {
        check_pool(scope, key)?;
        let holding = self.holding(key)?;
        if amount > holding.quantity {
            return Err(HoldingsError::InsufficientQuantity {
                key,
                available: holding.quantity,
                requested: amount,
            });
        }
        if value > holding.value {
            return Err(HoldingsError::InsufficientValue {
                key,
                available: holding.value,
                requested: value,
            });
        }
        let (debit, credit) = if holding.is_liability {
            (
                role(holding, key, AccountType::Liability)?,
                role(holding, key, AccountType::Expense)?,
            )
        } else {
            (
                role(holding, key, AccountType::Equity)?,
                role(holding, key, AccountType::Asset)?,
            )
        };

        post_pair(ledger, scope, debit, credit, value)?;

        let holding = self.holding_mut(key)?;
        holding.quantity -= amount;
        holding.value -= value;
        debug!(holding = %key, amount, value, "Holding decreased");
        Ok(())
    }

    /// Revalue the held quantity through the valuation provider and book the
    /// difference as gain or loss.
    ///
    /// Returns the signed value change; `(true, 0)` when no provider is
    /// attached.
    pub fn update(
        &mut self,
        ledger: &mut Ledger,
        scope: &JournalScope,
        key: HoldingKey,
    ) -> Result<SignedAmount> {
        check_pool(scope, key)?;
        let holding = self.holding(key)?;
        let Some(valuation) = holding.valuation.clone() else {
            return Ok(SignedAmount::ZERO);
        };
        let provider = self.resolve_valuation(&valuation)?;
        let current = provider.get_quote(key.pool, key.share_class, key.asset, holding.quantity)?;

        if current == holding.value {
            return Ok(SignedAmount::ZERO);
        }
        let rising = current > holding.value;
        let delta = current.abs_diff(holding.value);

        let (debit, credit) = match (holding.is_liability, rising) {
            (false, true) => (
                role(holding, key, AccountType::Asset)?,
                role(holding, key, AccountType::Gain)?,
            ),
            (false, false) => (
                role(holding, key, AccountType::Loss)?,
                role(holding, key, AccountType::Asset)?,
            ),
            // A liability that costs more is adverse.
            (true, true) => (
                role(holding, key, AccountType::Expense)?,
                role(holding, key, AccountType::Liability)?,
            ),
            (true, false) => (
                role(holding, key, AccountType::Liability)?,
                role(holding, key, AccountType::Expense)?,
            ),
        };

        post_pair(ledger, scope, debit, credit, delta)?;

        let holding = self.holding_mut(key)?;
        holding.value = current;
        debug!(holding = %key, value = current, delta, rising, "Holding revalued");
        Ok(if rising {
            SignedAmount::positive(delta)
        } else {
            SignedAmount::negative(delta)
        })
    }

    /// Value of `amount` units of the holding's asset, via its provider.
    /// Identity when no provider is attached.
    pub fn quote(&self, key: HoldingKey, amount: Amount) -> Result<Amount> {
        let holding = self.holding(key)?;
        match &holding.valuation {
            Some(id) => {
                let provider = self.resolve_valuation(id)?;
                Ok(provider.get_quote(key.pool, key.share_class, key.asset, amount)?)
            }
            None => Ok(amount),
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────

    pub fn set_snapshot(
        &mut self,
        pool: PoolId,
        share_class: ShareClassId,
        network: NetworkId,
        is_snapshot: bool,
        nonce: u64,
    ) {
        debug!(pool = %pool, share_class = %share_class, network = %network, is_snapshot, nonce, "Holding snapshot set");
        self.snapshots.insert(
            (pool, share_class, network),
            HoldingSnapshot { is_snapshot, nonce },
        );
    }

    pub fn snapshot(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        network: NetworkId,
    ) -> HoldingSnapshot {
        self.snapshots
            .get(&(pool, share_class, network))
            .copied()
            .unwrap_or_default()
    }

    // ── Checkpoints ─────────────────────────────────────────────────

    pub fn checkpoint(&self) -> HoldingsCheckpoint {
        HoldingsCheckpoint {
            holdings: self.holdings.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: HoldingsCheckpoint) {
        self.holdings = checkpoint.holdings;
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn is_initialized(&self, key: HoldingKey) -> bool {
        self.holdings.contains_key(&key)
    }

    pub fn holding(&self, key: HoldingKey) -> Result<&Holding> {
        self.holdings
            .get(&key)
            .ok_or(HoldingsError::NotInitialized { key })
    }

    fn holding_mut(&mut self, key: HoldingKey) -> Result<&mut Holding> {
        self.holdings
            .get_mut(&key)
            .ok_or(HoldingsError::NotInitialized { key })
    }

    pub fn quantity(&self, key: HoldingKey) -> Result<Amount> {
        Ok(self.holding(key)?.quantity)
    }

    pub fn value(&self, key: HoldingKey) -> Result<Amount> {
        Ok(self.holding(key)?.value)
    }

    pub fn valuation(&self, key: HoldingKey) -> Result<Option<&ValuationId>> {
        Ok(self.holding(key)?.valuation.as_ref())
    }

    pub fn is_liability(&self, key: HoldingKey) -> Result<bool> {
        Ok(self.holding(key)?.is_liability)
    }

    pub fn account_id(&self, key: HoldingKey, kind: AccountType) -> Result<AccountId> {
        role(self.holding(key)?, key, kind)
    }

    /// Every holding of a share class, ordered by asset.
    pub fn holdings_of(&self, pool: PoolId, share_class: ShareClassId) -> Vec<(HoldingKey, &Holding)> {
        let mut holdings: Vec<_> = self
            .holdings
            .iter()
            .filter(|(key, _)| key.pool == pool && key.share_class == share_class)
            .map(|(key, holding)| (*key, holding))
            .collect();
        holdings.sort_by_key(|(key, _)| key.asset);
        holdings
    }
}

impl Default for HoldingsTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn role(holding: &Holding, key: HoldingKey, kind: AccountType) -> Result<AccountId> {
    holding
        .account(kind)
        .ok_or(HoldingsError::MissingAccountRole { key, kind })
}

fn check_pool(scope: &JournalScope, key: HoldingKey) -> Result<()> {
    if scope.pool() != key.pool {
        return Err(HoldingsError::PoolMismatch {
            scope_pool: scope.pool(),
            holding_pool: key.pool,
        });
    }
    Ok(())
}

fn post_pair(
    ledger: &mut Ledger,
    scope: &JournalScope,
    debit: AccountId,
    credit: AccountId,
    amount: Amount,
) -> Result<()> {
    ledger.post_debit(scope, debit, amount)?;
    ledger.post_credit(scope, credit, amount)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fundline_types::{AssetId, ManualClock, OracleValuation, D18, SCALE};

    const POOL: PoolId = PoolId(1);

    struct Fixture {
        ledger: Ledger,
        tracker: HoldingsTracker,
        oracle: Arc<OracleValuation>,
        key: HoldingKey,
        liability: HoldingKey,
    }

    fn accounts(kinds: &[AccountType], base: u128) -> Vec<HoldingAccount> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| HoldingAccount::new(AccountId(base + i as u128), *kind))
            .collect()
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut ledger = Ledger::new(clock.clone());
        let mut tracker = HoldingsTracker::new(clock);
        let oracle = Arc::new(OracleValuation::new());
        tracker.register_valuation(ValuationId::new("oracle"), oracle.clone());

        let sc = ShareClassId::derive(POOL, 1);
        let key = HoldingKey::new(POOL, sc, AssetId::new(NetworkId(1), 1));
        let liability = HoldingKey::new(POOL, sc, AssetId::new(NetworkId(1), 2));

        let asset_accounts = accounts(&crate::ASSET_ROLES, 100);
        let liability_accounts = accounts(&crate::LIABILITY_ROLES, 200);
        for account in asset_accounts.iter().chain(&liability_accounts) {
            ledger.create_account(POOL, account.id, account.kind).unwrap();
        }
        tracker
            .initialize(key, Some(ValuationId::new("oracle")), false, &asset_accounts)
            .unwrap();
        tracker
            .initialize(liability, Some(ValuationId::new("oracle")), true, &liability_accounts)
            .unwrap();

        Fixture {
            ledger,
            tracker,
            oracle,
            key,
            liability,
        }
    }

    fn value_of(f: &Fixture, key: HoldingKey, kind: AccountType) -> SignedAmount {
        let id = f.tracker.account_id(key, kind).unwrap();
        f.ledger.account_value(POOL, id).unwrap()
    }

    #[test]
    fn increase_posts_asset_and_equity() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 1000, 1000).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(f.tracker.quantity(f.key).unwrap(), 1000);
        assert_eq!(f.tracker.value(f.key).unwrap(), 1000);
        assert_eq!(value_of(&f, f.key, AccountType::Asset), SignedAmount::positive(1000));
        assert_eq!(value_of(&f, f.key, AccountType::Equity), SignedAmount::positive(1000));
    }

    #[test]
    fn holding_survives_json_round_trip() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 1000, 1500).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        let holding = f.tracker.holding(f.key).unwrap();
        let json = serde_json::to_string(holding).unwrap();
        assert!(json.contains("\"Equity\""));
        let restored: Holding = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, holding);
        assert_eq!(restored.account(AccountType::Gain), Some(AccountId(102)));

        let liability = f.tracker.holding(f.liability).unwrap();
        let restored: Holding =
            serde_json::from_str(&serde_json::to_string(liability).unwrap()).unwrap();
        assert!(restored.is_liability);
        assert_eq!(restored.roles(), &crate::LIABILITY_ROLES);

        let key: HoldingKey =
            serde_json::from_str(&serde_json::to_string(&f.key).unwrap()).unwrap();
        assert_eq!(key, f.key);
    }

    #[test]
    fn decrease_mirrors_increase() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 1000, 1000).unwrap();
        f.tracker.decrease(&mut f.ledger, &scope, f.key, 400, 400).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(f.tracker.quantity(f.key).unwrap(), 600);
        assert_eq!(value_of(&f, f.key, AccountType::Asset), SignedAmount::positive(600));
        assert_eq!(value_of(&f, f.key, AccountType::Equity), SignedAmount::positive(600));
    }

    #[test]
    fn decrease_beyond_quantity_fails() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 10, 10).unwrap();
        let err = f
            .tracker
            .decrease(&mut f.ledger, &scope, f.key, 11, 10)
            .unwrap_err();
        assert_eq!(
            err,
            HoldingsError::InsufficientQuantity {
                key: f.key,
                available: 10,
                requested: 11
            }
        );
        assert_eq!(f.tracker.quantity(f.key).unwrap(), 10);
        f.ledger.abort_batch(scope).unwrap();
    }

    #[test]
    fn liability_movements_use_expense_and_liability() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker
            .increase(&mut f.ledger, &scope, f.liability, 300, 300)
            .unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(
            value_of(&f, f.liability, AccountType::Expense),
            SignedAmount::positive(300)
        );
        assert_eq!(
            value_of(&f, f.liability, AccountType::Liability),
            SignedAmount::positive(300)
        );
    }

    #[test]
    fn upward_revaluation_books_gain() {
        let mut f = fixture();
        f.oracle.set_price(f.key.asset, D18::ONE, Utc::now());
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 1000, 1000).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        f.oracle.set_price(f.key.asset, D18(3 * SCALE / 2), Utc::now());
        let scope = f.ledger.open_batch(POOL).unwrap();
        let delta = f.tracker.update(&mut f.ledger, &scope, f.key).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(delta, SignedAmount::positive(500));
        assert_eq!(f.tracker.value(f.key).unwrap(), 1500);
        assert_eq!(value_of(&f, f.key, AccountType::Gain), SignedAmount::positive(500));
        assert_eq!(value_of(&f, f.key, AccountType::Equity), SignedAmount::positive(1000));
    }

    #[test]
    fn downward_revaluation_books_loss() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 1000, 1000).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        f.oracle.set_price(f.key.asset, D18(SCALE * 9 / 10), Utc::now());
        let scope = f.ledger.open_batch(POOL).unwrap();
        let delta = f.tracker.update(&mut f.ledger, &scope, f.key).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(delta, SignedAmount::negative(100));
        assert_eq!(value_of(&f, f.key, AccountType::Loss), SignedAmount::negative(100));
        assert_eq!(value_of(&f, f.key, AccountType::Asset), SignedAmount::positive(900));
    }

    #[test]
    fn costlier_liability_is_adverse() {
        let mut f = fixture();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker
            .increase(&mut f.ledger, &scope, f.liability, 100, 100)
            .unwrap();
        f.ledger.commit_batch(scope).unwrap();

        f.oracle.set_price(f.liability.asset, D18(2 * SCALE), Utc::now());
        let scope = f.ledger.open_batch(POOL).unwrap();
        let delta = f.tracker.update(&mut f.ledger, &scope, f.liability).unwrap();
        f.ledger.commit_batch(scope).unwrap();

        assert_eq!(delta, SignedAmount::positive(100));
        assert_eq!(
            value_of(&f, f.liability, AccountType::Liability),
            SignedAmount::positive(200)
        );
    }

    #[test]
    fn update_without_valuation_is_noop() {
        let mut f = fixture();
        let sc = ShareClassId::derive(POOL, 1);
        let key = HoldingKey::new(POOL, sc, AssetId::new(NetworkId(1), 3));
        f.tracker
            .initialize(key, None, false, &accounts(&crate::ASSET_ROLES, 100))
            .unwrap();
        let scope = f.ledger.open_batch(POOL).unwrap();
        let delta = f.tracker.update(&mut f.ledger, &scope, key).unwrap();
        f.ledger.commit_batch(scope).unwrap();
        assert_eq!(delta, SignedAmount::ZERO);
        assert_eq!(f.tracker.quote(key, 77).unwrap(), 77);
    }

    #[test]
    fn initialize_validates_inputs() {
        let mut f = fixture();
        let sc = ShareClassId::derive(POOL, 2);
        let key = HoldingKey::new(POOL, sc, AssetId::new(NetworkId(1), 1));

        let err = f
            .tracker
            .initialize(key, None, false, &accounts(&crate::LIABILITY_ROLES, 1))
            .unwrap_err();
        assert_eq!(
            err,
            HoldingsError::WrongAccountCount {
                key,
                expected: 4,
                actual: 2
            }
        );

        let duplicated = accounts(
            &[
                AccountType::Asset,
                AccountType::Asset,
                AccountType::Gain,
                AccountType::Loss,
            ],
            1,
        );
        assert!(matches!(
            f.tracker.initialize(key, None, false, &duplicated),
            Err(HoldingsError::MissingAccountRole {
                kind: AccountType::Equity,
                ..
            })
        ));

        let err = f
            .tracker
            .initialize(
                key,
                Some(ValuationId::new("missing")),
                false,
                &accounts(&crate::ASSET_ROLES, 1),
            )
            .unwrap_err();
        assert!(matches!(err, HoldingsError::UnknownValuation { .. }));

        let err = f
            .tracker
            .initialize(f.key, None, false, &accounts(&crate::ASSET_ROLES, 1))
            .unwrap_err();
        assert_eq!(err, HoldingsError::AlreadyInitialized { key: f.key });
    }

    #[test]
    fn mutations_require_initialized_holding() {
        let mut f = fixture();
        let unknown = HoldingKey::new(POOL, ShareClassId::derive(POOL, 9), f.key.asset);
        let scope = f.ledger.open_batch(POOL).unwrap();
        let err = f
            .tracker
            .increase(&mut f.ledger, &scope, unknown, 1, 1)
            .unwrap_err();
        assert_eq!(err, HoldingsError::NotInitialized { key: unknown });
        f.ledger.abort_batch(scope).unwrap();
    }

    #[test]
    fn movements_need_an_open_batch_of_the_same_pool() {
        let mut f = fixture();
        f.ledger
            .create_account(PoolId(2), AccountId(1), AccountType::Asset)
            .unwrap();
        let scope = f.ledger.open_batch(PoolId(2)).unwrap();
        let err = f
            .tracker
            .increase(&mut f.ledger, &scope, f.key, 1, 1)
            .unwrap_err();
        assert_eq!(
            err,
            HoldingsError::PoolMismatch {
                scope_pool: PoolId(2),
                holding_pool: POOL
            }
        );
        f.ledger.commit_batch(scope).unwrap();
        assert_eq!(f.tracker.quantity(f.key).unwrap(), 0);
    }

    #[test]
    fn checkpoint_restores_positions() {
        let mut f = fixture();
        let checkpoint = f.tracker.checkpoint();
        let scope = f.ledger.open_batch(POOL).unwrap();
        f.tracker.increase(&mut f.ledger, &scope, f.key, 50, 50).unwrap();
        f.ledger.abort_batch(scope).unwrap();
        f.tracker.restore(checkpoint);
        assert_eq!(f.tracker.quantity(f.key).unwrap(), 0);
    }

    #[test]
    fn snapshots_default_to_unset() {
        let mut f = fixture();
        let sc = f.key.share_class;
        assert_eq!(
            f.tracker.snapshot(POOL, sc, NetworkId(1)),
            HoldingSnapshot::default()
        );
        f.tracker.set_snapshot(POOL, sc, NetworkId(1), true, 4);
        assert_eq!(
            f.tracker.snapshot(POOL, sc, NetworkId(1)),
            HoldingSnapshot {
                is_snapshot: true,
                nonce: 4
            }
        );
    }

    #[test]
    fn update_valuation_requires_registration() {
        let mut f = fixture();
        assert!(matches!(
            f.tracker.update_valuation(f.key, ValuationId::new("nope")),
            Err(HoldingsError::UnknownValuation { .. })
        ));
        f.tracker
            .register_valuation(ValuationId::new("other"), Arc::new(OracleValuation::new()));
        f.tracker
            .update_valuation(f.key, ValuationId::new("other"))
            .unwrap();
        assert_eq!(
            f.tracker.valuation(f.key).unwrap(),
            Some(&ValuationId::new("other"))
        );
        assert_eq!(f.tracker.holdings_of(POOL, f.key.share_class).len(), 2);
    }
}
