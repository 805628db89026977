use chrono::{DateTime, Utc};
use fundline_types::{AccountId, Amount, JournalId, PoolId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    Debit,
    Credit,
}

/// One auditable posting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub account: AccountId,
    pub side: EntrySide,
    pub amount: Amount,
    pub posted_at: DateTime<Utc>,
}

/// Proof of an open journal batch.
///
/// Returned by `Ledger::open_batch` and consumed by `commit_batch` or
/// `abort_batch`. Not `Clone`: whoever holds it owns the unit of work.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an open journal scope must be committed or aborted"]
pub struct JournalScope {
    pool: PoolId,
    journal_id: JournalId,
}

impl JournalScope {
    pub(crate) fn new(pool: PoolId, journal_id: JournalId) -> Self {
        Self { pool, journal_id }
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn journal_id(&self) -> JournalId {
        self.journal_id
    }
}

/// Emitted when a balanced batch commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub pool: PoolId,
    pub journal_id: JournalId,
    pub debited: Amount,
    pub credited: Amount,
    pub entries: Vec<JournalEntry>,
    pub committed_at: DateTime<Utc>,
}
