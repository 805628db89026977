//! Deterministic account ids.
//!
//! Asset and Expense accounts are keyed by asset id; the four per-network
//! buckets by network id. Ids are recomputed on every use, never stored.

use fundline_types::{AccountId, AccountType, AssetId, NetworkId};

pub fn asset_account(asset: AssetId) -> AccountId {
    AccountId::for_asset(asset, AccountType::Asset)
}

pub fn expense_account(asset: AssetId) -> AccountId {
    AccountId::for_asset(asset, AccountType::Expense)
}

pub fn equity_account(network: NetworkId) -> AccountId {
    AccountId::for_network(network, AccountType::Equity)
}

pub fn gain_account(network: NetworkId) -> AccountId {
    AccountId::for_network(network, AccountType::Gain)
}

pub fn loss_account(network: NetworkId) -> AccountId {
    AccountId::for_network(network, AccountType::Loss)
}

pub fn liability_account(network: NetworkId) -> AccountId {
    AccountId::for_network(network, AccountType::Liability)
}

/// The four per-network accounts, with their classes.
pub fn network_accounts(network: NetworkId) -> [(AccountId, AccountType); 4] {
    [
        (equity_account(network), AccountType::Equity),
        (gain_account(network), AccountType::Gain),
        (loss_account(network), AccountType::Loss),
        (liability_account(network), AccountType::Liability),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_embed_their_type() {
        let network = NetworkId(2);
        for (id, kind) in network_accounts(network) {
            assert_eq!(id.kind(), Some(kind));
        }
        let asset = AssetId::new(network, 1);
        assert_eq!(asset_account(asset).kind(), Some(AccountType::Asset));
        assert_eq!(expense_account(asset).kind(), Some(AccountType::Expense));
    }

    #[test]
    fn asset_and_network_ids_do_not_collide() {
        // Network 0 asset 0 packs to the same raw value as network 0 itself;
        // the type code keeps the accounts apart.
        let asset = AssetId::new(NetworkId(0), 0);
        let ids = [
            asset_account(asset),
            expense_account(asset),
            equity_account(NetworkId(0)),
            gain_account(NetworkId(0)),
            loss_account(NetworkId(0)),
            liability_account(NetworkId(0)),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
