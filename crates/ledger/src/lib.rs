//! # fundline-ledger
//!
//! Per-pool chart of accounts with double-entry journal batches.
//!
//! Every economic event is recorded as debit/credit postings inside an
//! explicit unit of work:
//!
//! ```text
//! open_batch(pool) ──► post_debit / post_credit ... ──► commit_batch
//!                                                   └─► abort_batch
//! ```
//!
//! - At most one batch is open at a time; opening a second fails fast.
//! - `commit_batch` succeeds only when the batch's debits equal its credits.
//!   A rejected or aborted batch reverts every posting it made.
//! - `account_value` is the single oriented reading of a balance consumed
//!   by NAV: debit-normal accounts (Asset, Expense) are positive when
//!   debits ≥ credits, all others when credits ≥ debits.

#![deny(unsafe_code)]

pub mod account;
pub mod error;
pub mod journal;
pub mod ledger;

pub use account::{Account, AccountTotals};
pub use error::{LedgerError, Result};
pub use journal::{CommitRecord, EntrySide, JournalEntry, JournalScope};
pub use ledger::Ledger;
