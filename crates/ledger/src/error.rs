use fundline_types::{AccountId, Amount, JournalId, MathError, PoolId};
use thiserror::Error;

/// Ledger errors. Each carries the operands needed to explain the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // --- Accounts ---
    #[error("account {account} already exists in {pool}")]
    AccountExists { pool: PoolId, account: AccountId },

    #[error("account {account} not found in {pool}")]
    AccountNotFound { pool: PoolId, account: AccountId },

    // --- Journal batch state machine ---
    #[error(
        "cannot open batch for {requested}: {open_pool} already has {open_journal} open"
    )]
    BatchAlreadyOpen {
        open_pool: PoolId,
        open_journal: JournalId,
        requested: PoolId,
    },

    #[error("no journal batch is open")]
    NoOpenBatch,

    #[error(
        "journal scope mismatch: open batch is {expected_journal} of {expected_pool}, got {actual_journal} of {actual_pool}"
    )]
    ScopeMismatch {
        expected_pool: PoolId,
        expected_journal: JournalId,
        actual_pool: PoolId,
        actual_journal: JournalId,
    },

    // --- Invariants ---
    #[error("unbalanced entries in {journal_id} of {pool}: debited {debited}, credited {credited}")]
    Unbalanced {
        pool: PoolId,
        journal_id: JournalId,
        debited: Amount,
        credited: Amount,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_display_carries_both_sums() {
        let err = LedgerError::Unbalanced {
            pool: PoolId(3),
            journal_id: JournalId(7),
            debited: 100,
            credited: 90,
        };
        let s = err.to_string();
        assert!(s.contains("unbalanced entries"));
        assert!(s.contains("100"));
        assert!(s.contains("90"));
        assert!(s.contains("journal:7"));
    }
}
