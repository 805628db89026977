use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundline_types::{
    checked_add, AccountId, AccountType, Amount, Clock, JournalId, PoolId, SignedAmount,
    SystemClock,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::account::{Account, AccountTotals};
use crate::error::{LedgerError, Result};
use crate::journal::{CommitRecord, EntrySide, JournalEntry, JournalScope};

/// State of the single open batch.
struct OpenBatch {
    pool: PoolId,
    journal_id: JournalId,
    debited: Amount,
    credited: Amount,
    entries: Vec<JournalEntry>,
    /// `last_updated` of each touched account before the posting, in
    /// posting order. Used to revert a discarded batch.
    previous_updates: Vec<DateTime<Utc>>,
}

/// Double-entry ledger over every pool's chart of accounts.
///
/// Postings happen only inside a journal batch. At most one batch is open
/// at a time, and it only commits when its debits equal its credits. A batch
/// that fails to commit, or is aborted, leaves no trace on any account.
pub struct Ledger {
    accounts: HashMap<(PoolId, AccountId), Account>,
    open: Option<OpenBatch>,
    last_journal: HashMap<PoolId, JournalId>,
    history: HashMap<PoolId, Vec<CommitRecord>>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: HashMap::new(),
            open: None,
            last_journal: HashMap::new(),
            history: HashMap::new(),
            clock,
        }
    }

    // ── Accounts ────────────────────────────────────────────────────

    pub fn create_account(&mut self, pool: PoolId, id: AccountId, kind: AccountType) -> Result<()> {
        if self.accounts.contains_key(&(pool, id)) {
            return Err(LedgerError::AccountExists { pool, account: id });
        }
        let account = Account::new(pool, id, kind, self.clock.now());
        debug!(pool = %pool, account = %id, kind = %kind, "Account created");
        self.accounts.insert((pool, id), account);
        Ok(())
    }

    pub fn set_account_metadata(
        &mut self,
        pool: PoolId,
        id: AccountId,
        metadata: impl Into<String>,
    ) -> Result<()> {
        let account = self.account_mut(pool, id)?;
        account.metadata = Some(metadata.into());
        Ok(())
    }

    pub fn account_exists(&self, pool: PoolId, id: AccountId) -> bool {
        self.accounts.contains_key(&(pool, id))
    }

    pub fn account(&self, pool: PoolId, id: AccountId) -> Result<&Account> {
        self.accounts
            .get(&(pool, id))
            .ok_or(LedgerError::AccountNotFound { pool, account: id })
    }

    /// Balance on the account's normal side.
    pub fn account_value(&self, pool: PoolId, id: AccountId) -> Result<SignedAmount> {
        Ok(self.account(pool, id)?.value())
    }

    pub fn account_totals(&self, pool: PoolId, id: AccountId) -> Result<AccountTotals> {
        Ok(self.account(pool, id)?.totals())
    }

    fn account_mut(&mut self, pool: PoolId, id: AccountId) -> Result<&mut Account> {
        self.accounts
            .get_mut(&(pool, id))
            .ok_or(LedgerError::AccountNotFound { pool, account: id })
    }

    // ── Journal batches ─────────────────────────────────────────────

    /// Open the unit of work for `pool`. Fails fast if any batch is open.
    pub fn open_batch(&mut self, pool: PoolId) -> Result<JournalScope> {
        if let Some(open) = &self.open {
            return Err(LedgerError::BatchAlreadyOpen {
                open_pool: open.pool,
                open_journal: open.journal_id,
                requested: pool,
            });
        }

        let journal_id = self
            .last_journal
            .get(&pool)
            .map(|last| JournalId(last.0 + 1))
            .unwrap_or(JournalId(1));
        self.last_journal.insert(pool, journal_id);

        self.open = Some(OpenBatch {
            pool,
            journal_id,
            debited: 0,
            credited: 0,
            entries: Vec::new(),
            previous_updates: Vec::new(),
        });

        debug!(pool = %pool, journal_id = journal_id.0, "Journal batch opened");
        Ok(JournalScope::new(pool, journal_id))
    }

    pub fn post_debit(&mut self, scope: &JournalScope, account: AccountId, amount: Amount) -> Result<()> {
        self.post(scope, account, EntrySide::Debit, amount)
    }

    pub fn post_credit(
        &mut self,
        scope: &JournalScope,
        account: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.post(scope, account, EntrySide::Credit, amount)
    }

    fn post(
        &mut self,
        scope: &JournalScope,
        account_id: AccountId,
        side: EntrySide,
        amount: Amount,
    ) -> Result<()> {
        self.check_scope(scope)?;
        let pool = scope.pool();
        let now = self.clock.now();

        // Validate everything before touching state.
        let account = self.account(pool, account_id)?;
        if amount == 0 {
            return Ok(());
        }
        let new_total = match side {
            EntrySide::Debit => checked_add(account.total_debit, amount, "post_debit")?,
            EntrySide::Credit => checked_add(account.total_credit, amount, "post_credit")?,
        };
        let open = self.open.as_ref().ok_or(LedgerError::NoOpenBatch)?;
        let new_sum = match side {
            EntrySide::Debit => checked_add(open.debited, amount, "batch_debited")?,
            EntrySide::Credit => checked_add(open.credited, amount, "batch_credited")?,
        };

        let account = self.account_mut(pool, account_id)?;
        let previous_update = account.last_updated;
        match side {
            EntrySide::Debit => account.total_debit = new_total,
            EntrySide::Credit => account.total_credit = new_total,
        }
        account.last_updated = now;

        let open = self.open.as_mut().ok_or(LedgerError::NoOpenBatch)?;
        match side {
            EntrySide::Debit => open.debited = new_sum,
            EntrySide::Credit => open.credited = new_sum,
        }
        let entry = JournalEntry {
            entry_id: Uuid::new_v4(),
            account: account_id,
            side,
            amount,
            posted_at: now,
        };
        debug!(
            pool = %pool,
            journal_id = open.journal_id.0,
            account = %account_id,
            side = ?side,
            amount,
            "Journal entry posted"
        );
        open.entries.push(entry);
        open.previous_updates.push(previous_update);
        Ok(())
    }

    /// Close the unit of work.
    ///
    /// On an unbalanced batch every posting since open is reverted and the
    /// slot is cleared before the error is returned.
    pub fn commit_batch(&mut self, scope: JournalScope) -> Result<CommitRecord> {
        self.check_scope(&scope)?;
        let open = self.open.take().ok_or(LedgerError::NoOpenBatch)?;

        if open.debited != open.credited {
            let err = LedgerError::Unbalanced {
                pool: open.pool,
                journal_id: open.journal_id,
                debited: open.debited,
                credited: open.credited,
            };
            warn!(
                pool = %open.pool,
                journal_id = open.journal_id.0,
                debited = open.debited,
                credited = open.credited,
                "Unbalanced journal batch discarded"
            );
            self.revert(open);
            return Err(err);
        }

        let record = CommitRecord {
            pool: open.pool,
            journal_id: open.journal_id,
            debited: open.debited,
            credited: open.credited,
            entries: open.entries,
            committed_at: self.clock.now(),
        };
        info!(
            pool = %record.pool,
            journal_id = record.journal_id.0,
            debited = record.debited,
            credited = record.credited,
            entries = record.entries.len(),
            "Journal batch committed"
        );
        self.history
            .entry(record.pool)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    /// Discard the unit of work, reverting every posting since open.
    pub fn abort_batch(&mut self, scope: JournalScope) -> Result<()> {
        self.check_scope(&scope)?;
        let open = self.open.take().ok_or(LedgerError::NoOpenBatch)?;
        warn!(
            pool = %open.pool,
            journal_id = open.journal_id.0,
            entries = open.entries.len(),
            "Journal batch aborted"
        );
        self.revert(open);
        Ok(())
    }

    fn revert(&mut self, open: OpenBatch) {
        let pool = open.pool;
        for (entry, previous_update) in open
            .entries
            .into_iter()
            .zip(open.previous_updates)
            .rev()
        {
            // Entries were applied to existing accounts; reversing in order
            // restores the exact prior totals.
            if let Some(account) = self.accounts.get_mut(&(pool, entry.account)) {
                match entry.side {
                    EntrySide::Debit => account.total_debit -= entry.amount,
                    EntrySide::Credit => account.total_credit -= entry.amount,
                }
                account.last_updated = previous_update;
            }
        }
    }

    fn check_scope(&self, scope: &JournalScope) -> Result<()> {
        let open = self.open.as_ref().ok_or(LedgerError::NoOpenBatch)?;
        if open.pool != scope.pool() || open.journal_id != scope.journal_id() {
            return Err(LedgerError::ScopeMismatch {
                expected_pool: open.pool,
                expected_journal: open.journal_id,
                actual_pool: scope.pool(),
                actual_journal: scope.journal_id(),
            });
        }
        Ok(())
    }

    // ── Batch and journal readers ───────────────────────────────────

    pub fn is_batch_open(&self) -> bool {
        self.open.is_some()
    }

    /// Pool of the open batch, if any.
    pub fn open_pool(&self) -> Option<PoolId> {
        self.open.as_ref().map(|open| open.pool)
    }

    /// Running `(debited, credited)` sums of the open batch.
    pub fn open_sums(&self) -> Option<(Amount, Amount)> {
        self.open.as_ref().map(|open| (open.debited, open.credited))
    }

    /// Latest journal id handed out for `pool`.
    pub fn last_journal_id(&self, pool: PoolId) -> Option<JournalId> {
        self.last_journal.get(&pool).copied()
    }

    /// Committed batches of `pool`, oldest first.
    pub fn journal(&self, pool: PoolId) -> &[CommitRecord] {
        self.history.get(&pool).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn accounts_of(&self, pool: PoolId) -> impl Iterator<Item = &Account> {
        self.accounts
            .values()
            .filter(move |account| account.pool == pool)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
