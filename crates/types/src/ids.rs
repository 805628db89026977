use serde::{Deserialize, Serialize};
use std::fmt;

/// Pool identifier: a logical fund with its own chart of accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

/// Settlement network identifier.
///
/// Each network contributes its own equity/gain/loss/liability sub-ledger
/// to a pool's NAV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u16);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network:{}", self.0)
    }
}

/// Asset identifier.
///
/// The issuing network lives in bits 64..80, a per-network counter in the
/// low 64 bits. Only the low 80 bits are ever populated, which leaves room
/// for a 16-bit account type code when deriving account ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u128);

impl AssetId {
    pub fn new(network: NetworkId, counter: u64) -> Self {
        Self(((network.0 as u128) << 64) | counter as u128)
    }

    /// The network the asset was registered on.
    pub fn network(&self) -> NetworkId {
        NetworkId((self.0 >> 64) as u16)
    }

    pub fn counter(&self) -> u64 {
        self.0 as u64
    }

    pub fn raw(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}/{}", self.network().0, self.counter())
    }
}

/// Share class identifier, 16 bytes derived from (pool, index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareClassId(pub [u8; 16]);

impl ShareClassId {
    /// Deterministic id for the `index`-th share class of a pool.
    pub fn derive(pool: PoolId, index: u32) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"fundline-share-class-v1:");
        hasher.update(&pool.0.to_le_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash.as_bytes()[..16]);
        Self(id)
    }
}

impl fmt::Display for ShareClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sc:")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Settlement cycle identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochId(pub u64);

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch:{}", self.0)
    }
}

/// Per-pool, monotonically increasing journal identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalId(pub u64);

impl fmt::Display for JournalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "journal:{}", self.0)
    }
}

/// Identifier under which a valuation provider is registered.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuationId(pub String);

impl ValuationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ValuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller identity, resolved against the external registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account class. Determines the normal side of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Equity,
    Loss,
    Gain,
    Expense,
    Liability,
}

impl AccountType {
    pub const ALL: [AccountType; 6] = [
        AccountType::Asset,
        AccountType::Equity,
        AccountType::Loss,
        AccountType::Gain,
        AccountType::Expense,
        AccountType::Liability,
    ];

    /// 16-bit code packed into derived account ids.
    pub fn code(&self) -> u16 {
        match self {
            AccountType::Asset => 1,
            AccountType::Equity => 2,
            AccountType::Loss => 3,
            AccountType::Gain => 4,
            AccountType::Expense => 5,
            AccountType::Liability => 6,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn normal_side(&self) -> NormalSide {
        match self {
            AccountType::Asset | AccountType::Expense => NormalSide::Debit,
            _ => NormalSide::Credit,
        }
    }

    /// Whether the account id is derived from an asset id (as opposed to a
    /// network id).
    pub fn is_asset_scoped(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountType::Asset => "asset",
            AccountType::Equity => "equity",
            AccountType::Loss => "loss",
            AccountType::Gain => "gain",
            AccountType::Expense => "expense",
            AccountType::Liability => "liability",
        };
        f.write_str(name)
    }
}

/// The side on which an account's balance normally grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalSide {
    Debit,
    Credit,
}

/// Ledger account identifier.
///
/// Accounts backing holdings and networks are never looked up in a stored
/// mapping; their id is recomputed from (asset or network id, type code).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u128);

impl AccountId {
    /// Pack a type code into the low 16 bits of `raw`.
    pub fn derive(raw: u128, kind: AccountType) -> Self {
        Self((raw << 16) | kind.code() as u128)
    }

    /// Asset-scoped account (Asset, Expense).
    pub fn for_asset(asset: AssetId, kind: AccountType) -> Self {
        Self::derive(asset.raw(), kind)
    }

    /// Network-scoped account (Equity, Gain, Loss, Liability).
    pub fn for_network(network: NetworkId, kind: AccountType) -> Self {
        Self::derive(network.0 as u128, kind)
    }

    /// Type code carried in the low 16 bits, if this id was derived.
    pub fn kind(&self) -> Option<AccountType> {
        AccountType::from_code(self.0 as u16)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account:{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_carries_network() {
        let asset = AssetId::new(NetworkId(7), 42);
        assert_eq!(asset.network(), NetworkId(7));
        assert_eq!(asset.counter(), 42);
        assert_eq!(asset.to_string(), "asset:7/42");
    }

    #[test]
    fn account_derivation_is_pure() {
        let asset = AssetId::new(NetworkId(1), 3);
        let a = AccountId::for_asset(asset, AccountType::Asset);
        let b = AccountId::for_asset(asset, AccountType::Asset);
        assert_eq!(a, b);
        assert_eq!(a.kind(), Some(AccountType::Asset));
        assert_ne!(a, AccountId::for_asset(asset, AccountType::Expense));
    }

    #[test]
    fn network_accounts_do_not_collide() {
        let network = NetworkId(5);
        let ids: Vec<_> = [
            AccountType::Equity,
            AccountType::Gain,
            AccountType::Loss,
            AccountType::Liability,
        ]
        .into_iter()
        .map(|kind| AccountId::for_network(network, kind))
        .collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(
            AccountId::for_network(NetworkId(5), AccountType::Equity),
            AccountId::for_network(NetworkId(6), AccountType::Equity)
        );
    }

    #[test]
    fn normal_sides() {
        assert_eq!(AccountType::Asset.normal_side(), NormalSide::Debit);
        assert_eq!(AccountType::Expense.normal_side(), NormalSide::Debit);
        for kind in [
            AccountType::Equity,
            AccountType::Gain,
            AccountType::Loss,
            AccountType::Liability,
        ] {
            assert_eq!(kind.normal_side(), NormalSide::Credit);
        }
    }

    #[test]
    fn share_class_ids_are_deterministic_and_distinct() {
        let pool = PoolId(9);
        assert_eq!(ShareClassId::derive(pool, 1), ShareClassId::derive(pool, 1));
        assert_ne!(ShareClassId::derive(pool, 1), ShareClassId::derive(pool, 2));
        assert_ne!(
            ShareClassId::derive(PoolId(1), 1),
            ShareClassId::derive(PoolId(2), 1)
        );
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PoolId(12)).unwrap();
        assert_eq!(json, "12");
        let restored: PoolId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, PoolId(12));
    }
}
