use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use fundline_types::{checked_add, Amount, MathError, NetworkId, PoolId, ShareClassId, D18};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_SYMBOL_LEN: usize = 32;

/// Deployment salt of a share class token. Unique across the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Latest stored price of a share class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: D18,
    pub computed_at: DateTime<Utc>,
}

/// Cumulative issuance counters of one network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIssuance {
    pub issued: Amount,
    pub revoked: Amount,
}

impl NetworkIssuance {
    /// Net outstanding on this network, floored at zero.
    pub fn net(&self) -> Amount {
        self.issued.saturating_sub(self.revoked)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareClass {
    pub pool: PoolId,
    /// Derived from the pool and `index`.
    pub id: ShareClassId,
    /// Position of the class within its pool, starting at 1.
    pub index: u32,
    pub name: String,
    pub symbol: String,
    pub salt: Salt,
    /// Unset until the first price update.
    pub price: Option<PricePoint>,
    /// Issued and revoked counters per network.
    pub issuance: BTreeMap<NetworkId, NetworkIssuance>,
    /// Networks in the order they first saw issuance or revocation.
    pub active_networks: Vec<NetworkId>,
}

impl ShareClass {
    /// Net supply summed over the active networks.
    pub fn total_issuance(&self) -> Result<Amount, MathError> {
        self.active_networks
            .iter()
            .filter_map(|network| self.issuance.get(network))
            .try_fold(0u128, |total, counters| {
                checked_add(total, counters.net(), "total issuance")
            })
    }
}
