// crates/keel-queue/src/queue.rs
//
// The exit queue scheduler.
//
// One redemption entry per holder. A join spreads the amount across future
// epochs, filling each epoch up to the global cap and the per-address cap
// before advancing. A second join appends strictly after the holder's
// existing window, never interleaving. Epochs are derived from an injected
// block height; only epochs that have closed can be withdrawn or restaked,
// and each epoch allocation is claimed at most once.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use keel_core::{AccountId, Admin, AuthContext, KeelError, Ledger, TokenId, Wad};

use crate::stake::StakeBook;

/// One redemption request window per holder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitEntry {
    /// Unclaimed amount across all scheduled epochs.
    pub total_amount: Wad,
    /// First epoch holding an allocation for this entry.
    pub first_exit_epoch: u64,
    /// Last epoch holding an allocation for this entry.
    pub last_exit_epoch: u64,
    /// Fixed per-epoch allocations, claimable once each.
    pub allocations: BTreeMap<u64, Wad>,
}

/// The exit queue scheduler. One instance per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitQueue {
    admin: Admin,
    supply_token: TokenId,
    /// Custody account holding queued supply until it is claimed.
    account: AccountId,
    /// Block at which epoch 0 begins.
    first_block: u64,
    /// Epoch length in blocks.
    epoch_size: u64,
    /// Cap on total outflow scheduled into any single epoch.
    max_per_epoch: Wad,
    /// Cap on a single holder's outflow in any single epoch.
    max_per_address: Wad,
    entries: BTreeMap<AccountId, ExitEntry>,
    total_per_epoch: BTreeMap<u64, Wad>,
}

impl ExitQueue {
    /// Create an empty queue.
    ///
    /// # Errors
    /// `InvalidConfig` if `epoch_size` or either cap is zero.
    pub fn new(
        admin: AccountId,
        supply_token: TokenId,
        account: AccountId,
        first_block: u64,
        epoch_size: u64,
        max_per_epoch: Wad,
        max_per_address: Wad,
    ) -> Result<Self, KeelError> {
        if epoch_size == 0 {
            return Err(KeelError::InvalidConfig(
                "epoch size must be greater than zero".to_string(),
            ));
        }
        if max_per_epoch == 0 || max_per_address == 0 {
            return Err(KeelError::InvalidConfig(
                "epoch caps must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            admin: Admin::new(admin),
            supply_token,
            account,
            first_block,
            epoch_size,
            max_per_epoch,
            max_per_address,
            entries: BTreeMap::new(),
            total_per_epoch: BTreeMap::new(),
        })
    }

    /// The epoch containing `current_block`. Blocks before `first_block`
    /// fall into epoch 0.
    pub fn current_epoch(&self, current_block: u64) -> u64 {
        current_block.saturating_sub(self.first_block) / self.epoch_size
    }

    /// Queue `amount` of the holder's supply for redemption, pulling the
    /// tokens into queue custody and scheduling them across future epochs.
    pub fn join(
        &mut self,
        ledger: &mut Ledger,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        self.join_from(ledger, holder, holder, amount, current_block)
    }

    /// Like `join`, but pulls custody from `source` instead of the holder.
    /// Used by the stake book, which already holds the unstaked tokens.
    pub fn join_from(
        &mut self,
        ledger: &mut Ledger,
        source: AccountId,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        let now_epoch = self.current_epoch(current_block);
        self.join_at_epoch(ledger, source, holder, amount, now_epoch)
    }

    /// Like `join_from`, but against an explicitly supplied current epoch.
    /// The acceleration overlay routes joins through here so scheduling
    /// follows its stretched clock.
    pub fn join_at_epoch(
        &mut self,
        ledger: &mut Ledger,
        source: AccountId,
        holder: AccountId,
        amount: Wad,
        now_epoch: u64,
    ) -> Result<(), KeelError> {
        if amount == 0 {
            return Err(KeelError::InvalidConfig(
                "join amount must be greater than zero".to_string(),
            ));
        }
        ledger.transfer(self.supply_token, source, self.account, amount)?;
        self.schedule(holder, amount, now_epoch);
        Ok(())
    }

    /// Migrate a pre-existing obligation into the queue without a token
    /// transfer. The administrator is responsible for funding the custody
    /// account to cover migrated amounts.
    pub fn set_owed(
        &mut self,
        ctx: &AuthContext,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_owed")?;
        if amount == 0 {
            return Err(KeelError::InvalidConfig(
                "owed amount must be greater than zero".to_string(),
            ));
        }
        let now_epoch = self.current_epoch(current_block);
        self.schedule(holder, amount, now_epoch);
        Ok(())
    }

    /// Withdraw the holder's allocations for the given closed epochs.
    /// Returns the amount transferred out.
    ///
    /// # Errors
    /// `NotYetProcessed` if any requested epoch has not closed;
    /// `NothingToWithdraw` if the requested epochs hold nothing for the
    /// holder (including epochs already claimed).
    pub fn withdraw_epochs(
        &mut self,
        ledger: &mut Ledger,
        holder: AccountId,
        epochs: &[u64],
        now_epoch: u64,
    ) -> Result<Wad, KeelError> {
        let claimable = self.claimable_total(holder, epochs, now_epoch)?;
        if claimable == 0 {
            return Err(KeelError::NothingToWithdraw);
        }
        let available = ledger.balance(self.supply_token, self.account);
        if available < claimable {
            return Err(KeelError::InsufficientBalance {
                requested: claimable,
                available,
            });
        }
        self.consume(holder, epochs);
        ledger.transfer(self.supply_token, self.account, holder, claimable)?;
        Ok(claimable)
    }

    /// Route the holder's allocations for the given closed epochs back into
    /// the staking position instead of withdrawing them. Returns the amount
    /// restaked.
    ///
    /// # Errors
    /// `NotYetProcessed` if any requested epoch has not closed;
    /// `NothingToStake` if the requested epochs hold nothing for the holder.
    pub fn restake(
        &mut self,
        ledger: &mut Ledger,
        stake: &mut StakeBook,
        holder: AccountId,
        epochs: &[u64],
        now_epoch: u64,
    ) -> Result<Wad, KeelError> {
        let claimable = self.claimable_total(holder, epochs, now_epoch)?;
        if claimable == 0 {
            return Err(KeelError::NothingToStake);
        }
        let available = ledger.balance(self.supply_token, self.account);
        if available < claimable {
            return Err(KeelError::InsufficientBalance {
                requested: claimable,
                available,
            });
        }
        self.consume(holder, epochs);
        ledger.transfer(self.supply_token, self.account, stake.account(), claimable)?;
        stake.credit(holder, claimable)?;
        Ok(claimable)
    }

    // ---- administrator tuning ----

    pub fn set_epoch_size(&mut self, ctx: &AuthContext, epoch_size: u64) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_epoch_size")?;
        if epoch_size == 0 {
            return Err(KeelError::InvalidConfig(
                "epoch size must be greater than zero".to_string(),
            ));
        }
        self.epoch_size = epoch_size;
        Ok(())
    }

    pub fn set_max_per_epoch(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_max_per_epoch")?;
        if cap == 0 {
            return Err(KeelError::InvalidConfig(
                "per-epoch cap must be greater than zero".to_string(),
            ));
        }
        self.max_per_epoch = cap;
        Ok(())
    }

    pub fn set_max_per_address(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_max_per_address")?;
        if cap == 0 {
            return Err(KeelError::InvalidConfig(
                "per-address cap must be greater than zero".to_string(),
            ));
        }
        self.max_per_address = cap;
        Ok(())
    }

    pub fn transfer_admin(
        &mut self,
        ctx: &AuthContext,
        new_admin: AccountId,
    ) -> Result<(), KeelError> {
        self.admin.transfer(ctx, new_admin)
    }

    // ---- reads ----

    /// The holder's redemption entry, if any.
    pub fn exit_entry(&self, holder: AccountId) -> Option<&ExitEntry> {
        self.entries.get(&holder)
    }

    /// The holder's allocations in epochs that have closed as of `now_epoch`.
    pub fn claimable_epochs(&self, holder: AccountId, now_epoch: u64) -> Vec<(u64, Wad)> {
        self.entries
            .get(&holder)
            .map(|entry| {
                entry
                    .allocations
                    .range(..now_epoch)
                    .map(|(&epoch, &amount)| (epoch, amount))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total scheduled outflow for `epoch`, across all holders.
    pub fn total_for_epoch(&self, epoch: u64) -> Wad {
        self.total_per_epoch.get(&epoch).copied().unwrap_or(0)
    }

    pub fn epoch_size(&self) -> u64 {
        self.epoch_size
    }

    pub fn max_per_epoch(&self) -> Wad {
        self.max_per_epoch
    }

    pub fn max_per_address(&self) -> Wad {
        self.max_per_address
    }

    /// Queue custody account.
    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn admin(&self) -> AccountId {
        self.admin.current()
    }

    // ---- internals ----

    /// Spread `amount` across epochs starting at the later of `now_epoch`
    /// and the epoch after the holder's existing window.
    fn schedule(&mut self, holder: AccountId, amount: Wad, now_epoch: u64) {
        let entry = self.entries.entry(holder).or_default();
        let fresh = entry.allocations.is_empty();
        let mut epoch = if fresh {
            now_epoch
        } else {
            now_epoch.max(entry.last_exit_epoch + 1)
        };

        let mut remaining = amount;
        let mut first_written: Option<u64> = None;
        while remaining > 0 {
            let epoch_total = self.total_per_epoch.get(&epoch).copied().unwrap_or(0);
            let holder_total = entry.allocations.get(&epoch).copied().unwrap_or(0);
            let capacity = self
                .max_per_epoch
                .saturating_sub(epoch_total)
                .min(self.max_per_address.saturating_sub(holder_total));
            if capacity == 0 {
                epoch += 1;
                continue;
            }
            let take = remaining.min(capacity);
            *entry.allocations.entry(epoch).or_insert(0) += take;
            *self.total_per_epoch.entry(epoch).or_insert(0) += take;
            first_written.get_or_insert(epoch);
            remaining -= take;
        }

        entry.total_amount += amount;
        if fresh {
            // A fresh entry's window starts at its first written epoch.
            entry.first_exit_epoch = first_written.unwrap_or(now_epoch);
        }
        entry.last_exit_epoch = entry
            .allocations
            .keys()
            .next_back()
            .copied()
            .unwrap_or(entry.last_exit_epoch);
    }

    /// Sum of the holder's allocations over the (deduplicated) requested
    /// epochs, validating that every epoch has closed. Read-only.
    fn claimable_total(
        &self,
        holder: AccountId,
        epochs: &[u64],
        now_epoch: u64,
    ) -> Result<Wad, KeelError> {
        let unique: BTreeSet<u64> = epochs.iter().copied().collect();
        for &epoch in &unique {
            if epoch >= now_epoch {
                return Err(KeelError::NotYetProcessed { epoch });
            }
        }
        let Some(entry) = self.entries.get(&holder) else {
            return Ok(0);
        };
        Ok(unique
            .iter()
            .filter_map(|epoch| entry.allocations.get(epoch))
            .sum())
    }

    /// Zero the holder's allocations for the requested epochs and drop the
    /// entry once fully claimed. Callers validate via `claimable_total`
    /// first.
    fn consume(&mut self, holder: AccountId, epochs: &[u64]) {
        let unique: BTreeSet<u64> = epochs.iter().copied().collect();
        let Some(entry) = self.entries.get_mut(&holder) else {
            return;
        };
        let mut claimed: Wad = 0;
        for epoch in unique {
            if let Some(amount) = entry.allocations.remove(&epoch) {
                claimed += amount;
                if let Some(total) = self.total_per_epoch.get_mut(&epoch) {
                    *total = total.saturating_sub(amount);
                    if *total == 0 {
                        self.total_per_epoch.remove(&epoch);
                    }
                }
            }
        }
        entry.total_amount -= claimed;
        if entry.allocations.is_empty() {
            self.entries.remove(&holder);
        }
    }
}
