use chrono::{DateTime, Utc};
use fundline_types::{AccountId, AccountType, Amount, NormalSide, PoolId, SignedAmount};
use serde::{Deserialize, Serialize};

/// A ledger account. Mutated only through journal postings; never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub pool: PoolId,
    pub id: AccountId,
    /// Fixed at creation, together with the normal side it implies.
    pub kind: AccountType,
    /// Cumulative debits posted, never netted.
    pub total_debit: Amount,
    /// Cumulative credits posted, never netted.
    pub total_credit: Amount,
    /// Free-form label set by the account owner.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last non-zero posting, or of creation.
    pub last_updated: DateTime<Utc>,
}

impl Account {
    pub fn new(pool: PoolId, id: AccountId, kind: AccountType, now: DateTime<Utc>) -> Self {
        Self {
            pool,
            id,
            kind,
            total_debit: 0,
            total_credit: 0,
            metadata: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn normal_side(&self) -> NormalSide {
        self.kind.normal_side()
    }

    /// Balance oriented on the account's normal side.
    ///
    /// Debit-normal accounts are positive when debits >= credits,
    /// credit-normal accounts when credits >= debits.
    pub fn value(&self) -> SignedAmount {
        let (grows, shrinks) = match self.normal_side() {
            NormalSide::Debit => (self.total_debit, self.total_credit),
            NormalSide::Credit => (self.total_credit, self.total_debit),
        };
        if grows >= shrinks {
            SignedAmount::positive(grows - shrinks)
        } else {
            SignedAmount::negative(shrinks - grows)
        }
    }

    pub fn totals(&self) -> AccountTotals {
        AccountTotals {
            debit: self.total_debit,
            credit: self.total_credit,
        }
    }
}

/// Cumulative debit and credit totals of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    pub debit: Amount,
    pub credit: Amount,
}
