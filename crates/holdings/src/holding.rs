use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use fundline_types::{AccountId, AccountType, Amount, AssetId, PoolId, ShareClassId, ValuationId};
use serde::{Deserialize, Serialize};

/// Identity of a holding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldingKey {
    pub pool: PoolId,
    pub share_class: ShareClassId,
    pub asset: AssetId,
}

impl HoldingKey {
    pub fn new(pool: PoolId, share_class: ShareClassId, asset: AssetId) -> Self {
        Self {
            pool,
            share_class,
            asset,
        }
    }
}

impl fmt::Display for HoldingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.pool, self.share_class, self.asset)
    }
}

/// Accounts an asset holding posts to.
pub const ASSET_ROLES: [AccountType; 4] = [
    AccountType::Asset,
    AccountType::Equity,
    AccountType::Gain,
    AccountType::Loss,
];

/// Accounts a liability holding posts to.
pub const LIABILITY_ROLES: [AccountType; 2] = [AccountType::Expense, AccountType::Liability];

/// A ledger account linked to a holding under a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingAccount {
    pub id: AccountId,
    pub kind: AccountType,
}

impl HoldingAccount {
    pub fn new(id: AccountId, kind: AccountType) -> Self {
        Self { id, kind }
    }
}

/// A tracked asset or liability position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub quantity: Amount,
    /// Value in pool currency, normalized.
    pub value: Amount,
    pub valuation: Option<ValuationId>,
    pub is_liability: bool,
    pub accounts: BTreeMap<AccountType, AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn account(&self, kind: AccountType) -> Option<AccountId> {
        self.accounts.get(&kind).copied()
    }

    pub fn roles(&self) -> &'static [AccountType] {
        if self.is_liability {
            &LIABILITY_ROLES
        } else {
            &ASSET_ROLES
        }
    }
}

/// Snapshot marker per (pool, share class, network), set by the
/// orchestrator once every holding on that network has been synced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub is_snapshot: bool,
    pub nonce: u64,
}
