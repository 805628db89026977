use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fundline_types::{
    mul_div, ActorId, AssetId, Clock, PoolAuthority, PoolId, Rounding, ShareClassId, SystemClock,
    ValuationProvider, D18,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GuardError, Result};

/// Basis points in 100%.
pub const MAX_BPS: u32 = 10_000;

pub const DEFAULT_MAX_PRICE_CHANGE_BPS: u32 = 1_000;
pub const DEFAULT_MAX_VALUATION_AGE_SECS: u64 = 3_600;
/// Largest age a `chrono::Duration` can hold, in whole seconds.
pub const MAX_VALUATION_AGE_SECS: u64 = (i64::MAX / 1_000) as u64;

// ── Configuration ───────────────────────────────────────────────────

/// Per-pool guard limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub max_price_change_bps: u32,
    pub max_valuation_age_secs: u64,
    /// When false every proposed price is accepted and recorded as the new
    /// baseline.
    pub enforce_limits: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_price_change_bps: DEFAULT_MAX_PRICE_CHANGE_BPS,
            max_valuation_age_secs: DEFAULT_MAX_VALUATION_AGE_SECS,
            enforce_limits: true,
        }
    }
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_price_change_bps > MAX_BPS {
            return Err(GuardError::InvalidMaxChange {
                bps: self.max_price_change_bps,
                max: MAX_BPS,
            });
        }
        if self.max_valuation_age_secs == 0 {
            return Err(GuardError::ZeroValuationAge);
        }
        if self.max_valuation_age_secs > MAX_VALUATION_AGE_SECS {
            return Err(GuardError::ValuationAgeTooLarge {
                secs: self.max_valuation_age_secs,
                max: MAX_VALUATION_AGE_SECS,
            });
        }
        Ok(())
    }

    /// Saturates at `Duration::MAX` for configs that skipped validation.
    pub fn max_valuation_age(&self) -> Duration {
        i64::try_from(self.max_valuation_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardState {
    #[default]
    Active,
    Paused,
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Who paused a pool, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRecord {
    pub actor: ActorId,
    pub reason: String,
    pub paused_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
struct PoolGuard {
    config: GuardConfig,
    state: GuardState,
    pause: Option<PauseRecord>,
    last_prices: HashMap<ShareClassId, D18>,
}

/// Outcome of a price check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceCheck {
    /// No comparable prior price, or limits are disabled.
    Baseline,
    /// Movement from the last validated price, within the ceiling.
    Within { change_bps: u32 },
}

impl PriceCheck {
    pub fn change_bps(&self) -> u32 {
        match self {
            Self::Baseline => 0,
            Self::Within { change_bps } => *change_bps,
        }
    }
}

/// Movement between two prices in basis points, rounded to nearest and
/// capped at 100%. `old` must be non-zero.
pub fn price_change_bps(old: D18, new: D18) -> Result<u32> {
    let diff = old.raw().abs_diff(new.raw());
    if diff >= old.raw() {
        return Ok(MAX_BPS);
    }
    let bps = mul_div(diff, MAX_BPS as u128, old.raw(), Rounding::Nearest)?;
    Ok(bps.min(MAX_BPS as u128) as u32)
}

// ── Guard ───────────────────────────────────────────────────────────

/// Price movement limits, valuation freshness checks and the per-pool
/// Active/Paused state machine.
///
/// Pools that were never configured run with the guard's default config.
pub struct PriceGuard {
    pools: HashMap<PoolId, PoolGuard>,
    default_config: GuardConfig,
    clock: Arc<dyn Clock>,
}

impl PriceGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pools: HashMap::new(),
            default_config: GuardConfig::default(),
            clock,
        }
    }

    /// Limits applied to pools without an explicit configuration.
    pub fn with_default_config(mut self, config: GuardConfig) -> Result<Self> {
        config.validate()?;
        self.default_config = config;
        Ok(self)
    }

    fn pool_entry(&mut self, pool: PoolId) -> &mut PoolGuard {
        let config = self.default_config;
        self.pools.entry(pool).or_insert_with(|| PoolGuard {
            config,
            ..PoolGuard::default()
        })
    }

    pub fn configure_guard(
        &mut self,
        authority: &dyn PoolAuthority,
        pool: PoolId,
        caller: &ActorId,
        config: GuardConfig,
    ) -> Result<()> {
        if !authority.is_admin(pool, caller) {
            return Err(GuardError::NotAdmin {
                pool,
                actor: caller.clone(),
            });
        }
        config.validate()?;
        self.pool_entry(pool).config = config;
        info!(
            pool = %pool,
            max_price_change_bps = config.max_price_change_bps,
            max_valuation_age_secs = config.max_valuation_age_secs,
            enforce_limits = config.enforce_limits,
            "Price guard configured"
        );
        Ok(())
    }

    /// Halt pricing for `pool`. Guardians and admins may pause.
    pub fn pause(
        &mut self,
        authority: &dyn PoolAuthority,
        pool: PoolId,
        caller: &ActorId,
        reason: impl Into<String>,
    ) -> Result<()> {
        if !authority.is_guardian(pool, caller) && !authority.is_admin(pool, caller) {
            return Err(GuardError::NotGuardian {
                pool,
                actor: caller.clone(),
            });
        }
        let now = self.clock.now();
        let guard = self.pool_entry(pool);
        if guard.state != GuardState::Active {
            return Err(GuardError::InvalidState {
                pool,
                expected: GuardState::Active,
                actual: guard.state,
            });
        }

        let reason = reason.into();
        warn!(pool = %pool, actor = %caller, reason = %reason, "Pool paused");
        guard.state = GuardState::Paused;
        guard.pause = Some(PauseRecord {
            actor: caller.clone(),
            reason,
            paused_at: now,
        });
        Ok(())
    }

    /// Resume pricing. Admin only.
    pub fn unpause(
        &mut self,
        authority: &dyn PoolAuthority,
        pool: PoolId,
        caller: &ActorId,
    ) -> Result<()> {
        if !authority.is_admin(pool, caller) {
            return Err(GuardError::NotAdmin {
                pool,
                actor: caller.clone(),
            });
        }
        let guard = self.pool_entry(pool);
        if guard.state != GuardState::Paused {
            return Err(GuardError::InvalidState {
                pool,
                expected: GuardState::Paused,
                actual: guard.state,
            });
        }
        guard.state = GuardState::Active;
        guard.pause = None;
        info!(pool = %pool, actor = %caller, "Pool unpaused");
        Ok(())
    }

    // ── Price validation ────────────────────────────────────────────

    /// Check `proposed` against the last validated price without recording
    /// it.
    pub fn check_price(
        &self,
        pool: PoolId,
        share_class: ShareClassId,
        proposed: D18,
    ) -> Result<PriceCheck> {
        let guard = self.pools.get(&pool);
        if guard.is_some_and(|g| g.state == GuardState::Paused) {
            return Err(GuardError::Paused { pool });
        }
        let config = guard.map_or(self.default_config, |g| g.config);
        let previous = guard.and_then(|g| g.last_prices.get(&share_class).copied());

        let previous = match previous {
            Some(previous) if config.enforce_limits && !previous.is_zero() => previous,
            _ => return Ok(PriceCheck::Baseline),
        };

        let change_bps = price_change_bps(previous, proposed)?;
        if change_bps > config.max_price_change_bps {
            warn!(
                pool = %pool,
                share_class = %share_class,
                previous = %previous,
                proposed = %proposed,
                change_bps,
                "Price rejected"
            );
            return Err(GuardError::PriceChangeTooLarge {
                share_class,
                previous,
                proposed,
                change_bps,
                max_bps: config.max_price_change_bps,
            });
        }
        Ok(PriceCheck::Within { change_bps })
    }

    /// Check `proposed` and, if accepted, make it the new baseline.
    pub fn validate_price(
        &mut self,
        pool: PoolId,
        share_class: ShareClassId,
        proposed: D18,
    ) -> Result<PriceCheck> {
        let check = self.check_price(pool, share_class, proposed)?;
        self.pool_entry(pool)
            .last_prices
            .insert(share_class, proposed);
        debug!(
            pool = %pool,
            share_class = %share_class,
            price = %proposed,
            change_bps = check.change_bps(),
            "Price validated"
        );
        Ok(check)
    }

    // ── Valuation freshness ─────────────────────────────────────────

    /// Whether the provider's price for `asset` is older than the pool's
    /// maximum valuation age. A never-priced asset is stale.
    pub fn check_staleness(
        &self,
        provider: &dyn ValuationProvider,
        pool: PoolId,
        share_class: ShareClassId,
        asset: AssetId,
    ) -> bool {
        let max_age = self.config(pool).max_valuation_age();
        match provider.last_updated(pool, share_class, asset) {
            Some(updated) => self.clock.now() - updated > max_age,
            None => true,
        }
    }

    pub fn require_fresh_valuation(
        &self,
        provider: &dyn ValuationProvider,
        pool: PoolId,
        share_class: ShareClassId,
        asset: AssetId,
    ) -> Result<()> {
        if self.check_staleness(provider, pool, share_class, asset) {
            return Err(GuardError::StaleValuation {
                asset,
                last_updated: provider.last_updated(pool, share_class, asset),
                max_age_secs: self.config(pool).max_valuation_age_secs,
            });
        }
        Ok(())
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn config(&self, pool: PoolId) -> GuardConfig {
        self.pools
            .get(&pool)
            .map_or(self.default_config, |guard| guard.config)
    }

    pub fn state(&self, pool: PoolId) -> GuardState {
        self.pools
            .get(&pool)
            .map(|guard| guard.state)
            .unwrap_or_default()
    }

    pub fn is_paused(&self, pool: PoolId) -> bool {
        self.state(pool) == GuardState::Paused
    }

    pub fn pause_record(&self, pool: PoolId) -> Option<&PauseRecord> {
        self.pools.get(&pool).and_then(|guard| guard.pause.as_ref())
    }

    pub fn last_validated_price(&self, pool: PoolId, share_class: ShareClassId) -> Option<D18> {
        self.pools
            .get(&pool)
            .and_then(|guard| guard.last_prices.get(&share_class).copied())
    }
}

impl Default for PriceGuard {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
