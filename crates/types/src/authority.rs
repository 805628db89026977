use std::collections::{HashMap, HashSet};

use crate::ids::{ActorId, PoolId};

/// Authorization checks answered by the external pool registry.
pub trait PoolAuthority: Send + Sync {
    /// Administrative set: may configure, pause and unpause.
    fn is_admin(&self, pool: PoolId, actor: &ActorId) -> bool;

    /// Guardian set: may pause only.
    fn is_guardian(&self, pool: PoolId, actor: &ActorId) -> bool;
}

/// In-memory registry of pool admins and guardians.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthority {
    admins: HashMap<PoolId, HashSet<ActorId>>,
    guardians: HashMap<PoolId, HashSet<ActorId>>,
}

impl StaticAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, pool: PoolId, actor: ActorId) -> Self {
        self.grant_admin(pool, actor);
        self
    }

    pub fn with_guardian(mut self, pool: PoolId, actor: ActorId) -> Self {
        self.grant_guardian(pool, actor);
        self
    }

    pub fn grant_admin(&mut self, pool: PoolId, actor: ActorId) {
        self.admins.entry(pool).or_default().insert(actor);
    }

    pub fn grant_guardian(&mut self, pool: PoolId, actor: ActorId) {
        self.guardians.entry(pool).or_default().insert(actor);
    }
}

impl PoolAuthority for StaticAuthority {
    fn is_admin(&self, pool: PoolId, actor: &ActorId) -> bool {
        self.admins
            .get(&pool)
            .is_some_and(|actors| actors.contains(actor))
    }

    fn is_guardian(&self, pool: PoolId, actor: &ActorId) -> bool {
        self.guardians
            .get(&pool)
            .is_some_and(|actors| actors.contains(actor))
    }
}
