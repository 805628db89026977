use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundline_types::{checked_add, Amount, Clock, NetworkId, PoolId, ShareClassId, SystemClock, D18};
use tracing::{debug, info};

use crate::error::{Result, ShareClassError};
use crate::share_class::{
    NetworkIssuance, PricePoint, Salt, ShareClass, MAX_NAME_LEN, MAX_SYMBOL_LEN,
};

/// Share class metadata, prices and per-network issuance counters.
pub struct ShareClassRegistry {
    counters: HashMap<PoolId, u32>,
    classes: HashMap<(PoolId, ShareClassId), ShareClass>,
    salts: HashSet<Salt>,
    clock: Arc<dyn Clock>,
}

impl ShareClassRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: HashMap::new(),
            classes: HashMap::new(),
            salts: HashSet::new(),
            clock,
        }
    }

    // ── Creation and metadata ───────────────────────────────────────

    /// Id the next share class of `pool` will receive.
    pub fn preview_next_share_class_id(&self, pool: PoolId) -> ShareClassId {
        ShareClassId::derive(pool, self.share_class_count(pool) + 1)
    }

    pub fn preview_share_class_id(&self, pool: PoolId, index: u32) -> ShareClassId {
        ShareClassId::derive(pool, index)
    }

    pub fn add_share_class(
        &mut self,
        pool: PoolId,
        name: &str,
        symbol: &str,
        salt: Salt,
    ) -> Result<ShareClassId> {
        validate_metadata(name, symbol, salt)?;
        if self.salts.contains(&salt) {
            return Err(ShareClassError::SaltAlreadyUsed { salt });
        }

        let index = self.share_class_count(pool) + 1;
        let id = ShareClassId::derive(pool, index);
        self.counters.insert(pool, index);
        self.salts.insert(salt);
        self.classes.insert(
            (pool, id),
            ShareClass {
                pool,
                id,
                index,
                name: name.to_string(),
                symbol: symbol.to_string(),
                salt,
                price: None,
                issuance: BTreeMap::new(),
                active_networks: Vec::new(),
            },
        );
        info!(pool = %pool, share_class = %id, index, symbol, "Share class added");
        Ok(id)
    }

    /// Replace name, symbol and salt. Keeping the current salt is allowed;
    /// switching to a salt used anywhere else is not.
    pub fn update_metadata(
        &mut self,
        pool: PoolId,
        share_class: ShareClassId,
        name: &str,
        symbol: &str,
        salt: Salt,
    ) -> Result<()> {
        validate_metadata(name, symbol, salt)?;
        let current = self.share_class(pool, share_class)?.salt;
        if salt != current && self.salts.contains(&salt) {
            return Err(ShareClassError::SaltAlreadyUsed { salt });
        }

        self.salts.insert(salt);
        let class = self.share_class_mut(pool, share_class)?;
        class.name = name.to_string();
        class.symbol = symbol.to_string();
        class.salt = salt;
        debug!(pool = %pool, share_class = %share_class, symbol, "Share class metadata updated");
        Ok(())
    }

    // ── Pricing ─────────────────────────────────────────────────────

    /// Check that a price computed at `computed_at` may be stored.
    pub fn check_price_update(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        let class = self.share_class(pool, share_class)?;
        let now = self.clock.now();
        if computed_at > now {
            return Err(ShareClassError::FuturePriceTime { computed_at, now });
        }
        if let Some(stored) = class.price {
            // Equal timestamps are accepted as corrections.
            if computed_at < stored.computed_at {
                return Err(ShareClassError::StalePriceTime {
                    stored: stored.computed_at,
                    proposed: computed_at,
                });
            }
        }
        Ok(())
    }

    pub fn update_share_price(
        &mut self,
        pool: PoolId,
        share_class: ShareClassId,
        price: D18,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_price_update(pool, share_class, computed_at)?;
        let class = self.share_class_mut(pool, share_class)?;
        class.price = Some(PricePoint { price, computed_at });
        info!(pool = %pool, share_class = %share_class, price = %price, %computed_at, "Share price updated");
        Ok(())
    }

    // ── Issuance ────────────────────────────────────────────────────

    /// Add to the cumulative counters of `network`, registering it on first
    /// use.
    pub fn update_shares(
        &mut self,
        pool: PoolId,
        share_class: ShareClassId,
        network: NetworkId,
        issuances: Amount,
        revocations: Amount,
    ) -> Result<()> {
        let class = self.share_class(pool, share_class)?;
        let current = class.issuance.get(&network).copied().unwrap_or_default();
        let updated = NetworkIssuance {
            issued: checked_add(current.issued, issuances, "issued")?,
            revoked: checked_add(current.revoked, revocations, "revoked")?,
        };

        let class = self.share_class_mut(pool, share_class)?;
        if !class.active_networks.contains(&network) {
            class.active_networks.push(network);
        }
        class.issuance.insert(network, updated);
        debug!(
            pool = %pool,
            share_class = %share_class,
            network = %network,
            issuances,
            revocations,
            "Share issuance updated"
        );
        Ok(())
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn exists(&self, pool: PoolId, share_class: ShareClassId) -> bool {
        self.classes.contains_key(&(pool, share_class))
    }

    pub fn share_class(&self, pool: PoolId, share_class: ShareClassId) -> Result<&ShareClass> {
        self.classes
            .get(&(pool, share_class))
            .ok_or(ShareClassError::NotFound { pool, share_class })
    }

    fn share_class_mut(&mut self, pool: PoolId, share_class: ShareClassId) -> Result<&mut ShareClass> {
        self.classes
            .get_mut(&(pool, share_class))
            .ok_or(ShareClassError::NotFound { pool, share_class })
    }

    pub fn share_class_count(&self, pool: PoolId) -> u32 {
        self.counters.get(&pool).copied().unwrap_or(0)
    }

    /// Net supply across active networks. Linear in the number of networks.
    pub fn total_issuance(&self, pool: PoolId, share_class: ShareClassId) -> Result<Amount> {
        Ok(self.share_class(pool, share_class)?.total_issuance()?)
    }

    pub fn issuance(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        network: NetworkId,
    ) -> Result<NetworkIssuance> {
        Ok(self
            .share_class(pool, share_class)?
            .issuance
            .get(&network)
            .copied()
            .unwrap_or_default())
    }

    /// Latest stored price, `None` until the first update.
    pub fn price_per_share(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
    ) -> Result<Option<PricePoint>> {
        Ok(self.share_class(pool, share_class)?.price)
    }

    pub fn active_networks(&self, pool: PoolId, share_class: ShareClassId) -> Result<&[NetworkId]> {
        Ok(&self.share_class(pool, share_class)?.active_networks)
    }
}

impl Default for ShareClassRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn validate_metadata(name: &str, symbol: &str, salt: Salt) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ShareClassError::InvalidName {
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return Err(ShareClassError::InvalidSymbol {
            len: symbol.len(),
            max: MAX_SYMBOL_LEN,
        });
    }
    if salt.is_zero() {
        return Err(ShareClassError::ZeroSalt);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fundline_types::{ManualClock, MathError, SCALE};

    const POOL: PoolId = PoolId(1);

    fn salt(byte: u8) -> Salt {
        Salt([byte; 32])
    }

    fn registry() -> (ShareClassRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (ShareClassRegistry::new(clock.clone()), clock)
    }

    #[test]
    fn ids_follow_the_pool_counter() {
        let (mut registry, _) = registry();
        let expected = registry.preview_next_share_class_id(POOL);
        let first = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        let second = registry.add_share_class(POOL, "Junior", "JNR", salt(2)).unwrap();

        assert_eq!(first, expected);
        assert_eq!(first, ShareClassId::derive(POOL, 1));
        assert_eq!(second, registry.preview_share_class_id(POOL, 2));
        assert_ne!(first, second);
        assert_eq!(registry.share_class_count(POOL), 2);
        assert_eq!(registry.price_per_share(POOL, first).unwrap(), None);
    }

    #[test]
    fn metadata_is_validated() {
        let (mut registry, _) = registry();
        assert_eq!(
            registry.add_share_class(POOL, "", "SNR", salt(1)).unwrap_err(),
            ShareClassError::InvalidName { len: 0, max: 128 }
        );
        let long = "x".repeat(33);
        assert_eq!(
            registry.add_share_class(POOL, "Senior", &long, salt(1)).unwrap_err(),
            ShareClassError::InvalidSymbol { len: 33, max: 32 }
        );
        assert_eq!(
            registry.add_share_class(POOL, "Senior", "SNR", salt(0)).unwrap_err(),
            ShareClassError::ZeroSalt
        );
        registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        assert_eq!(
            registry.add_share_class(PoolId(2), "Other", "OTH", salt(1)).unwrap_err(),
            ShareClassError::SaltAlreadyUsed { salt: salt(1) }
        );
    }

    #[test]
    fn update_metadata_allows_own_salt() {
        let (mut registry, _) = registry();
        let first = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        registry.add_share_class(POOL, "Junior", "JNR", salt(2)).unwrap();

        registry
            .update_metadata(POOL, first, "Senior A", "SNRA", salt(1))
            .unwrap();
        assert_eq!(registry.share_class(POOL, first).unwrap().symbol, "SNRA");
        assert!(matches!(
            registry.update_metadata(POOL, first, "Senior", "SNR", salt(2)),
            Err(ShareClassError::SaltAlreadyUsed { .. })
        ));
    }

    #[test]
    fn price_time_is_monotonic() {
        let (mut registry, clock) = registry();
        let sc = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        let t0 = clock.now();

        registry.update_share_price(POOL, sc, D18::ONE, t0).unwrap();
        // Same timestamp: correction.
        registry
            .update_share_price(POOL, sc, D18(SCALE + 1), t0)
            .unwrap();
        assert_eq!(
            registry.price_per_share(POOL, sc).unwrap().unwrap().price,
            D18(SCALE + 1)
        );

        let err = registry
            .update_share_price(POOL, sc, D18::ONE, t0 - Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, ShareClassError::StalePriceTime { .. }));

        let err = registry
            .update_share_price(POOL, sc, D18::ONE, t0 + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, ShareClassError::FuturePriceTime { .. }));

        clock.advance(Duration::seconds(5));
        registry
            .update_share_price(POOL, sc, D18::ONE, t0 + Duration::seconds(1))
            .unwrap();
    }

    #[test]
    fn issuance_sums_active_networks() {
        let (mut registry, _) = registry();
        let sc = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();

        registry.update_shares(POOL, sc, NetworkId(2), 1_000, 0).unwrap();
        registry.update_shares(POOL, sc, NetworkId(1), 500, 100).unwrap();
        registry.update_shares(POOL, sc, NetworkId(2), 0, 300).unwrap();
        // Over-revoked network contributes zero rather than going negative.
        registry.update_shares(POOL, sc, NetworkId(3), 10, 50).unwrap();

        assert_eq!(registry.total_issuance(POOL, sc).unwrap(), 700 + 400);
        assert_eq!(
            registry.active_networks(POOL, sc).unwrap(),
            &[NetworkId(2), NetworkId(1), NetworkId(3)]
        );
        assert_eq!(
            registry.issuance(POOL, sc, NetworkId(2)).unwrap(),
            NetworkIssuance {
                issued: 1_000,
                revoked: 300
            }
        );
        assert_eq!(
            registry.issuance(POOL, sc, NetworkId(9)).unwrap(),
            NetworkIssuance::default()
        );
    }

    #[test]
    fn total_issuance_overflow_is_an_error() {
        let (mut registry, _) = registry();
        let sc = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        registry.update_shares(POOL, sc, NetworkId(1), u128::MAX, 0).unwrap();
        registry.update_shares(POOL, sc, NetworkId(2), 1, 0).unwrap();

        assert_eq!(
            registry.total_issuance(POOL, sc).unwrap_err(),
            ShareClassError::Math(MathError::Overflow { op: "total issuance" })
        );
    }

    #[test]
    fn unknown_share_class_is_reported() {
        let (mut registry, _) = registry();
        let sc = ShareClassId::derive(POOL, 7);
        assert_eq!(
            registry.update_shares(POOL, sc, NetworkId(1), 1, 0).unwrap_err(),
            ShareClassError::NotFound {
                pool: POOL,
                share_class: sc
            }
        );
        assert!(!registry.exists(POOL, sc));
    }

    #[test]
    fn share_class_serializes() {
        let (mut registry, _) = registry();
        let sc = registry.add_share_class(POOL, "Senior", "SNR", salt(1)).unwrap();
        registry.update_shares(POOL, sc, NetworkId(1), 42, 0).unwrap();
        let class = registry.share_class(POOL, sc).unwrap();
        let json = serde_json::to_string(class).unwrap();
        let restored: ShareClass = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, class);
    }
}
