// crates/keel-queue/src/acceleration.rs
//
// Acceleration overlay for the exit queue.
//
// The overlay wraps the base queue's epoch clock. While a policy is active
// and the base epoch has passed the policy's start, the epoch distance past
// the start is stretched by `(denominator + numerator) / denominator`, so
// scheduled epochs close sooner than the base clock alone would allow.
// `disable` is a one-way transition: afterwards every overlay-routed call
// is rejected and scheduling authority rests with the base queue, reachable
// through the `base`/`base_mut` accessors.

use serde::{Deserialize, Serialize};

use keel_core::{AccountId, Admin, AuthContext, KeelError, Ledger, Wad};

use crate::queue::ExitQueue;
use crate::stake::StakeBook;

/// Administrator-set epoch compression factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerationPolicy {
    /// Numerator of the compression factor.
    pub numerator: u32,
    /// Denominator of the compression factor. Always greater than zero.
    pub denominator: u32,
    /// Base epoch at which compression begins.
    pub start_epoch: u64,
}

/// The exit queue behind an acceleration overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceleratedExitQueue {
    admin: Admin,
    policy: Option<AccelerationPolicy>,
    disabled: bool,
    queue: ExitQueue,
}

impl AcceleratedExitQueue {
    /// Wrap a base queue. No policy is active until `set_policy`.
    pub fn new(admin: AccountId, queue: ExitQueue) -> Self {
        Self {
            admin: Admin::new(admin),
            policy: None,
            disabled: false,
            queue,
        }
    }

    /// Install or replace the acceleration policy.
    ///
    /// # Errors
    /// `InvalidConfig` if `denominator` is zero; `AccelerationDisabled`
    /// after `disable`.
    pub fn set_policy(
        &mut self,
        ctx: &AuthContext,
        numerator: u32,
        denominator: u32,
        start_epoch: u64,
    ) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.admin.ensure(ctx, "set_policy")?;
        if denominator == 0 {
            return Err(KeelError::InvalidConfig(
                "acceleration denominator must be greater than zero".to_string(),
            ));
        }
        self.policy = Some(AccelerationPolicy {
            numerator,
            denominator,
            start_epoch,
        });
        Ok(())
    }

    /// Permanently disable the overlay. One-way: no overlay-routed call is
    /// authorized afterwards.
    pub fn disable(&mut self, ctx: &AuthContext) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.admin.ensure(ctx, "disable")?;
        self.disabled = true;
        self.policy = None;
        Ok(())
    }

    /// The effective epoch at `current_block`: the base epoch, stretched
    /// past the policy's start while the overlay is active.
    pub fn current_epoch(&self, current_block: u64) -> u64 {
        let base = self.queue.current_epoch(current_block);
        match self.policy {
            Some(policy) if !self.disabled && base >= policy.start_epoch => {
                let elapsed = u128::from(base - policy.start_epoch);
                let factor = u128::from(policy.denominator) + u128::from(policy.numerator);
                let stretched = elapsed * factor / u128::from(policy.denominator);
                policy
                    .start_epoch
                    .saturating_add(stretched.min(u128::from(u64::MAX)) as u64)
            }
            _ => base,
        }
    }

    /// Queue a redemption, scheduled on the accelerated clock.
    pub fn join(
        &mut self,
        ledger: &mut Ledger,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        self.ensure_active()?;
        let now_epoch = self.current_epoch(current_block);
        self.queue
            .join_at_epoch(ledger, holder, holder, amount, now_epoch)
    }

    /// Withdraw closed epochs, judged against the accelerated clock.
    pub fn withdraw_epochs(
        &mut self,
        ledger: &mut Ledger,
        holder: AccountId,
        epochs: &[u64],
        current_block: u64,
    ) -> Result<Wad, KeelError> {
        self.ensure_active()?;
        let now_epoch = self.current_epoch(current_block);
        self.queue.withdraw_epochs(ledger, holder, epochs, now_epoch)
    }

    /// Restake closed epochs, judged against the accelerated clock.
    pub fn restake(
        &mut self,
        ledger: &mut Ledger,
        stake: &mut StakeBook,
        holder: AccountId,
        epochs: &[u64],
        current_block: u64,
    ) -> Result<Wad, KeelError> {
        self.ensure_active()?;
        let now_epoch = self.current_epoch(current_block);
        self.queue
            .restake(ledger, stake, holder, epochs, now_epoch)
    }

    // ---- cap tuning pass-throughs (active overlay only) ----

    pub fn set_epoch_size(&mut self, ctx: &AuthContext, epoch_size: u64) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.queue.set_epoch_size(ctx, epoch_size)
    }

    pub fn set_max_per_epoch(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.queue.set_max_per_epoch(ctx, cap)
    }

    pub fn set_max_per_address(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.queue.set_max_per_address(ctx, cap)
    }

    pub fn set_owed(
        &mut self,
        ctx: &AuthContext,
        holder: AccountId,
        amount: Wad,
        current_block: u64,
    ) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.queue.set_owed(ctx, holder, amount, current_block)
    }

    /// Hand both the overlay's and the base queue's administrator
    /// capability to a new identity.
    pub fn transfer_admin(
        &mut self,
        ctx: &AuthContext,
        new_admin: AccountId,
    ) -> Result<(), KeelError> {
        self.ensure_active()?;
        self.admin.ensure(ctx, "transfer_admin")?;
        self.queue.transfer_admin(ctx, new_admin)?;
        self.admin.transfer(ctx, new_admin)
    }

    // ---- reads / access to the base scheduler ----

    /// The installed policy, if any.
    pub fn policy(&self) -> Option<AccelerationPolicy> {
        self.policy
    }

    /// Whether the overlay has been permanently disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The base queue. After `disable`, this is the scheduling authority.
    pub fn base(&self) -> &ExitQueue {
        &self.queue
    }

    pub fn base_mut(&mut self) -> &mut ExitQueue {
        &mut self.queue
    }

    fn ensure_active(&self) -> Result<(), KeelError> {
        if self.disabled {
            return Err(KeelError::AccelerationDisabled);
        }
        Ok(())
    }
}
