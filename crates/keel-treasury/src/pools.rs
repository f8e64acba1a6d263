// crates/keel-treasury/src/pools.rs
//
// Harvest pool registry.
//
// Pools are harvest-reward recipients weighted by share. The registry keeps
// `sum(pool.share) == total_shares` at all times; a registered pool always
// has a share greater than zero. Removal validates both the index and the
// account so a stale index cannot remove the wrong pool.

use serde::{Deserialize, Serialize};

use keel_core::{AccountId, KeelError};

/// A harvest-rewards recipient weighted by share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// The account that receives this pool's share of each distribution.
    pub account: AccountId,
    /// Relative harvest weight. Always greater than zero while registered.
    pub share: u32,
}

/// Registry of harvest pools and their total weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    total_shares: u64,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool or update an existing pool's share.
    ///
    /// # Errors
    /// `ZeroShare` if `share` is zero.
    pub fn upsert(&mut self, account: AccountId, share: u32) -> Result<(), KeelError> {
        if share == 0 {
            return Err(KeelError::ZeroShare);
        }
        if let Some(pool) = self.pools.iter_mut().find(|p| p.account == account) {
            self.total_shares = self.total_shares - u64::from(pool.share) + u64::from(share);
            pool.share = share;
        } else {
            self.pools.push(Pool { account, share });
            self.total_shares += u64::from(share);
        }
        Ok(())
    }

    /// Remove the pool at `index`, which must hold `account`.
    ///
    /// The last pool is swapped into the vacated slot, so indices are not
    /// stable across removals.
    ///
    /// # Errors
    /// `IndexMismatch` if `index` is out of range or the pool at `index` is
    /// not `account`.
    pub fn remove(&mut self, index: usize, account: AccountId) -> Result<(), KeelError> {
        match self.pools.get(index) {
            Some(pool) if pool.account == account => {
                self.total_shares -= u64::from(pool.share);
                self.pools.swap_remove(index);
                Ok(())
            }
            _ => Err(KeelError::IndexMismatch { index }),
        }
    }

    /// The share registered for `account`, if any.
    pub fn share_of(&self, account: AccountId) -> Option<u32> {
        self.pools
            .iter()
            .find(|p| p.account == account)
            .map(|p| p.share)
    }

    /// Sum of all registered shares.
    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    /// All registered pools.
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
