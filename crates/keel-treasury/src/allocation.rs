// crates/keel-treasury/src/allocation.rs
//
// Strategy allocation bookkeeping.
//
// Reserve handed to an external strategy is tracked as an `Allocation`
// holding both the cash deployed and the latest mark-to-market valuation.
// The book maintains `sum(allocation.mark) == total_reserve` across every
// mutation. `eject` is a hard bookkeeping reset used to recover from a
// misbehaving strategy; it deliberately performs no ledger reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use keel_core::{AccountId, KeelError, Wad};

/// Reserve deployed to a single external strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Net reserve cash handed to the strategy (deployments minus returns).
    pub reserve_deployed: Wad,
    /// Latest mark-to-market valuation of the position.
    pub last_mark_to_market: Wad,
}

/// Book of all strategy allocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationBook {
    allocations: BTreeMap<AccountId, Allocation>,
    total_reserve: Wad,
}

impl AllocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `amount` of new reserve deployed to `strategy`.
    pub fn allocate(&mut self, strategy: AccountId, amount: Wad) -> Result<(), KeelError> {
        let entry = self.allocations.entry(strategy).or_default();
        entry.reserve_deployed = entry
            .reserve_deployed
            .checked_add(amount)
            .ok_or(KeelError::Overflow)?;
        entry.last_mark_to_market = entry
            .last_mark_to_market
            .checked_add(amount)
            .ok_or(KeelError::Overflow)?;
        self.total_reserve = self
            .total_reserve
            .checked_add(amount)
            .ok_or(KeelError::Overflow)?;
        Ok(())
    }

    /// Replace the strategy's mark with `value`, moving the total by the
    /// delta in either direction.
    ///
    /// # Errors
    /// `UnknownStrategy` if no allocation record exists.
    pub fn set_mark(&mut self, strategy: AccountId, value: Wad) -> Result<(), KeelError> {
        let entry = self
            .allocations
            .get_mut(&strategy)
            .ok_or_else(|| KeelError::UnknownStrategy(strategy.to_string()))?;
        self.total_reserve = self.total_reserve - entry.last_mark_to_market;
        self.total_reserve = self
            .total_reserve
            .checked_add(value)
            .ok_or(KeelError::Overflow)?;
        entry.last_mark_to_market = value;
        Ok(())
    }

    /// Record `amount` of reserve returned by the strategy. Returns the
    /// amount by which the mark actually decreased (a strategy may return
    /// more than its mark when it earned yield).
    ///
    /// # Errors
    /// `UnknownStrategy` if no allocation record exists.
    pub fn withdraw(&mut self, strategy: AccountId, amount: Wad) -> Result<Wad, KeelError> {
        let entry = self
            .allocations
            .get_mut(&strategy)
            .ok_or_else(|| KeelError::UnknownStrategy(strategy.to_string()))?;
        let mark_reduction = amount.min(entry.last_mark_to_market);
        entry.last_mark_to_market -= mark_reduction;
        entry.reserve_deployed = entry.reserve_deployed.saturating_sub(amount);
        self.total_reserve -= mark_reduction;
        Ok(mark_reduction)
    }

    /// Hard-reset the strategy's record to zero and drop it from the book.
    /// Returns the mark that was written off. No ledger reconciliation.
    ///
    /// # Errors
    /// `UnknownStrategy` if no allocation record exists.
    pub fn eject(&mut self, strategy: AccountId) -> Result<Wad, KeelError> {
        let entry = self
            .allocations
            .remove(&strategy)
            .ok_or_else(|| KeelError::UnknownStrategy(strategy.to_string()))?;
        self.total_reserve -= entry.last_mark_to_market;
        Ok(entry.last_mark_to_market)
    }

    /// The allocation record for `strategy`, if any.
    pub fn get(&self, strategy: AccountId) -> Option<Allocation> {
        self.allocations.get(&strategy).copied()
    }

    /// Sum of all marks. Part of the backing reserve.
    pub fn total_reserve(&self) -> Wad {
        self.total_reserve
    }
}
