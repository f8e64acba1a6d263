// crates/keel-queue/src/stake.rs
//
// Minimal staking book.
//
// Tracks each holder's earning position in the supply token. Unstaking does
// not release tokens directly: it debits the position and routes the amount
// through the exit queue, where it drains across future epochs. A restake
// re-credits the position from claimed queue epochs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use keel_core::{AccountId, KeelError, Ledger, TokenId, Wad};

use crate::queue::ExitQueue;

/// Staked supply positions, custodied in a dedicated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeBook {
    supply_token: TokenId,
    account: AccountId,
    staked: BTreeMap<AccountId, Wad>,
    total_staked: Wad,
}

impl StakeBook {
    pub fn new(supply_token: TokenId, account: AccountId) -> Self {
        Self {
            supply_token,
            account,
            staked: BTreeMap::new(),
            total_staked: 0,
        }
    }

    /// Move `amount` of the holder's supply into the staking position.
    pub fn stake(
        &mut self,
        ledger: &mut Ledger,
        holder: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        if amount == 0 {
            return Err(KeelError::InvalidConfig(
                "stake amount must be greater than zero".to_string(),
            ));
        }
        ledger.transfer(self.supply_token, holder, self.account, amount)?;
        self.credit(holder, amount)
    }

    /// Debit `amount` from the holder's position and queue it for exit.
    ///
    /// # Errors
    /// `InsufficientBalance` if the holder's staked position is smaller
    /// than `amount`.
    pub fn unstake(
        &mut self,
        ledger: &mut Ledger,
        queue: &mut ExitQueue,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        let now_epoch = queue.current_epoch(current_block);
        self.unstake_at_epoch(ledger, queue, holder, amount, now_epoch)
    }

    /// Like `unstake`, but against an explicitly supplied current epoch
    /// (the acceleration overlay's stretched clock).
    pub fn unstake_at_epoch(
        &mut self,
        ledger: &mut Ledger,
        queue: &mut ExitQueue,
        holder: AccountId,
        amount: Wad,
        now_epoch: u64,
    ) -> Result<(), KeelError> {
        let staked = self.staked_of(holder);
        if staked < amount {
            return Err(KeelError::InsufficientBalance {
                requested: amount,
                available: staked,
            });
        }
        queue.join_at_epoch(ledger, self.account, holder, amount, now_epoch)?;
        self.staked.insert(holder, staked - amount);
        self.total_staked -= amount;
        Ok(())
    }

    /// Re-credit a position. Ledger movement is the caller's responsibility
    /// (used by queue restake, which transfers custody itself).
    pub(crate) fn credit(&mut self, holder: AccountId, amount: Wad) -> Result<(), KeelError> {
        let entry = self.staked.entry(holder).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(KeelError::Overflow)?;
        self.total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(KeelError::Overflow)?;
        Ok(())
    }

    /// The holder's staked amount.
    pub fn staked_of(&self, holder: AccountId) -> Wad {
        self.staked.get(&holder).copied().unwrap_or(0)
    }

    /// Sum of all staked positions.
    pub fn total_staked(&self) -> Wad {
        self.total_staked
    }

    /// Staking custody account.
    pub fn account(&self) -> AccountId {
        self.account
    }
}
