// crates/keel-engine/src/engine.rs
//
// The engine facade: one struct, one method per external operation.
//
// Construction wires the components around shared token and account
// identities. Epoch-sensitive operations read the overlay-aware clock once
// at the top of the call and use that snapshot throughout; once the
// acceleration overlay is disabled the same paths fall back to the base
// queue's clock automatically.

use serde::{Deserialize, Serialize};

use keel_amm::{FloorAmm, SwapOutcome};
use keel_core::{
    AccountId, AuthContext, IvOracle, IvRatio, KeelError, Ledger, TokenId, Wad,
};
use keel_queue::{AcceleratedExitQueue, AccelerationPolicy, ExitEntry, ExitQueue, StakeBook};
use keel_treasury::{Allocation, TreasuryEngine};

/// Deployment parameters for a fresh engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial administrator for every component.
    pub admin: AccountId,
    /// Block at which exit epoch 0 begins.
    pub first_block: u64,
    /// Exit epoch length in blocks.
    pub epoch_size: u64,
    /// Global redemption cap per epoch.
    pub max_per_epoch: Wad,
    /// Per-address redemption cap per epoch.
    pub max_per_address: Wad,
}

/// The supply token minted by the treasury.
pub fn supply_token() -> TokenId {
    TokenId::from_label("KEEL")
}

/// The reserve asset backing the supply token.
pub fn reserve_token() -> TokenId {
    TokenId::from_label("reserve-stable")
}

/// One Keel Protocol deployment: ledger plus all components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeelEngine {
    ledger: Ledger,
    block: u64,
    treasury: TreasuryEngine,
    stake: StakeBook,
    exit: AcceleratedExitQueue,
    amm: FloorAmm,
}

/// Log the outcome of an operation at the engine boundary.
fn record<T>(op: &'static str, result: Result<T, KeelError>) -> Result<T, KeelError> {
    match &result {
        Ok(_) => tracing::debug!(op, "accepted"),
        Err(err) => tracing::warn!(op, kind = %err.kind(), error = %err, "rejected"),
    }
    result
}

impl KeelEngine {
    /// Wire a fresh deployment.
    pub fn new(config: EngineConfig) -> Result<Self, KeelError> {
        let mut ledger = Ledger::new();
        ledger.register_token(supply_token());
        ledger.register_token(reserve_token());

        let treasury = TreasuryEngine::new(
            config.admin,
            supply_token(),
            reserve_token(),
            AccountId::from_label("treasury"),
            AccountId::from_label("treasury-rewards"),
        );
        let stake = StakeBook::new(supply_token(), AccountId::from_label("staking"));
        let queue = ExitQueue::new(
            config.admin,
            supply_token(),
            AccountId::from_label("exit-queue"),
            config.first_block,
            config.epoch_size,
            config.max_per_epoch,
            config.max_per_address,
        )?;
        let exit = AcceleratedExitQueue::new(config.admin, queue);
        let amm = FloorAmm::new(
            config.admin,
            supply_token(),
            reserve_token(),
            AccountId::from_label("amm-defend"),
            treasury.account(),
        );

        Ok(Self {
            ledger,
            block: config.first_block,
            treasury,
            stake,
            exit,
            amm,
        })
    }

    /// Advance the injected block height. The clock is monotonic.
    pub fn set_block(&mut self, block: u64) -> Result<(), KeelError> {
        if block < self.block {
            return Err(KeelError::InvalidConfig(
                "block height must not move backwards".to_string(),
            ));
        }
        self.block = block;
        Ok(())
    }

    // ---- treasury writes ----

    pub fn seed(
        &mut self,
        ctx: &AuthContext,
        reserve_amount: Wad,
        supply_amount: Wad,
    ) -> Result<(), KeelError> {
        record(
            "seed",
            self.treasury
                .seed(ctx, &mut self.ledger, reserve_amount, supply_amount),
        )
    }

    pub fn mint_and_allocate(
        &mut self,
        ctx: &AuthContext,
        grantee: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        record(
            "mint_and_allocate",
            self.treasury
                .mint_and_allocate(ctx, &mut self.ledger, grantee, amount),
        )
    }

    pub fn draw_allowance(&mut self, ctx: &AuthContext, amount: Wad) -> Result<(), KeelError> {
        record(
            "draw_allowance",
            self.treasury.draw_allowance(ctx, &mut self.ledger, amount),
        )
    }

    pub fn unallocate_and_burn(
        &mut self,
        ctx: &AuthContext,
        grantee: AccountId,
    ) -> Result<Wad, KeelError> {
        record(
            "unallocate_and_burn",
            self.treasury
                .unallocate_and_burn(ctx, &mut self.ledger, grantee),
        )
    }

    pub fn reset_iv(&mut self, ctx: &AuthContext) -> Result<IvRatio, KeelError> {
        record("reset_iv", self.treasury.reset_iv(ctx, &self.ledger))
    }

    pub fn harvest(
        &mut self,
        ctx: &AuthContext,
        distribution_percent: u8,
    ) -> Result<Wad, KeelError> {
        record(
            "harvest",
            self.treasury
                .harvest(ctx, &mut self.ledger, distribution_percent),
        )
    }

    pub fn distribute_harvest(&mut self) -> Result<Wad, KeelError> {
        record(
            "distribute_harvest",
            self.treasury.distribute_harvest(&mut self.ledger),
        )
    }

    pub fn allocate_reserve(
        &mut self,
        ctx: &AuthContext,
        strategy: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        record(
            "allocate_reserve",
            self.treasury
                .allocate_reserve(ctx, &mut self.ledger, strategy, amount),
        )
    }

    pub fn withdraw_allocation(
        &mut self,
        ctx: &AuthContext,
        strategy: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        record(
            "withdraw_allocation",
            self.treasury
                .withdraw_allocation(ctx, &mut self.ledger, strategy, amount),
        )
    }

    pub fn update_mark_to_market(
        &mut self,
        ctx: &AuthContext,
        strategy: AccountId,
        value: Wad,
    ) -> Result<(), KeelError> {
        record(
            "update_mark_to_market",
            self.treasury.update_mark_to_market(ctx, strategy, value),
        )
    }

    pub fn eject_allocation(
        &mut self,
        ctx: &AuthContext,
        strategy: AccountId,
    ) -> Result<Wad, KeelError> {
        record(
            "eject_allocation",
            self.treasury.eject_allocation(ctx, strategy),
        )
    }

    pub fn upsert_pool(
        &mut self,
        ctx: &AuthContext,
        account: AccountId,
        share: u32,
    ) -> Result<(), KeelError> {
        record("upsert_pool", self.treasury.upsert_pool(ctx, account, share))
    }

    pub fn remove_pool(
        &mut self,
        ctx: &AuthContext,
        index: usize,
        account: AccountId,
    ) -> Result<(), KeelError> {
        record("remove_pool", self.treasury.remove_pool(ctx, index, account))
    }

    // ---- staking and exit writes ----

    pub fn stake(&mut self, ctx: &AuthContext, amount: Wad) -> Result<(), KeelError> {
        record(
            "stake",
            self.stake.stake(&mut self.ledger, ctx.caller, amount),
        )
    }

    pub fn unstake(&mut self, ctx: &AuthContext, amount: Wad) -> Result<(), KeelError> {
        let now_epoch = self.exit.current_epoch(self.block);
        record(
            "unstake",
            self.stake.unstake_at_epoch(
                &mut self.ledger,
                self.exit.base_mut(),
                ctx.caller,
                amount,
                now_epoch,
            ),
        )
    }

    pub fn join(&mut self, ctx: &AuthContext, amount: Wad) -> Result<(), KeelError> {
        let now_epoch = self.exit.current_epoch(self.block);
        record(
            "join",
            self.exit.base_mut().join_at_epoch(
                &mut self.ledger,
                ctx.caller,
                ctx.caller,
                amount,
                now_epoch,
            ),
        )
    }

    pub fn withdraw_epochs(&mut self, ctx: &AuthContext, epochs: &[u64]) -> Result<Wad, KeelError> {
        let now_epoch = self.exit.current_epoch(self.block);
        record(
            "withdraw_epochs",
            self.exit
                .base_mut()
                .withdraw_epochs(&mut self.ledger, ctx.caller, epochs, now_epoch),
        )
    }

    pub fn restake(&mut self, ctx: &AuthContext, epochs: &[u64]) -> Result<Wad, KeelError> {
        let now_epoch = self.exit.current_epoch(self.block);
        record(
            "restake",
            self.exit.base_mut().restake(
                &mut self.ledger,
                &mut self.stake,
                ctx.caller,
                epochs,
                now_epoch,
            ),
        )
    }

    pub fn set_acceleration_policy(
        &mut self,
        ctx: &AuthContext,
        numerator: u32,
        denominator: u32,
        start_epoch: u64,
    ) -> Result<(), KeelError> {
        record(
            "set_acceleration_policy",
            self.exit.set_policy(ctx, numerator, denominator, start_epoch),
        )
    }

    pub fn disable_acceleration(&mut self, ctx: &AuthContext) -> Result<(), KeelError> {
        record("disable_acceleration", self.exit.disable(ctx))
    }

    pub fn set_epoch_size(&mut self, ctx: &AuthContext, epoch_size: u64) -> Result<(), KeelError> {
        record(
            "set_epoch_size",
            self.exit.base_mut().set_epoch_size(ctx, epoch_size),
        )
    }

    pub fn set_max_per_epoch(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        record(
            "set_max_per_epoch",
            self.exit.base_mut().set_max_per_epoch(ctx, cap),
        )
    }

    pub fn set_max_per_address(&mut self, ctx: &AuthContext, cap: Wad) -> Result<(), KeelError> {
        record(
            "set_max_per_address",
            self.exit.base_mut().set_max_per_address(ctx, cap),
        )
    }

    pub fn set_owed(
        &mut self,
        ctx: &AuthContext,
        holder: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        let block = self.block;
        record(
            "set_owed",
            self.exit.base_mut().set_owed(ctx, holder, amount, block),
        )
    }

    // ---- AMM writes ----

    pub fn add_pair(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        pair_account: AccountId,
    ) -> Result<(), KeelError> {
        let result = self.amm.add_pair(ctx, stable, pair_account);
        if result.is_ok() {
            self.ledger.register_token(stable);
        }
        record("add_pair", result)
    }

    pub fn set_defend_stable(&mut self, ctx: &AuthContext, token: TokenId) -> Result<(), KeelError> {
        let result = self.amm.set_defend_stable(ctx, token);
        if result.is_ok() {
            self.ledger.register_token(token);
        }
        record("set_defend_stable", result)
    }

    pub fn set_treasury(&mut self, ctx: &AuthContext, account: AccountId) -> Result<(), KeelError> {
        record("set_treasury", self.amm.set_treasury(ctx, account))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_supply_for_stable(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        amount_in: Wad,
        min_out: Wad,
        recipient: AccountId,
        deadline: u64,
    ) -> Result<SwapOutcome, KeelError> {
        record(
            "swap_exact_supply_for_stable",
            self.amm.swap_exact_supply_for_stable(
                ctx,
                &mut self.ledger,
                &self.treasury,
                stable,
                amount_in,
                min_out,
                recipient,
                deadline,
                self.block,
            ),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_stable_for_supply(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        amount_in: Wad,
        min_out: Wad,
        recipient: AccountId,
        deadline: u64,
    ) -> Result<Wad, KeelError> {
        record(
            "swap_exact_stable_for_supply",
            self.amm.swap_exact_stable_for_supply(
                ctx,
                &mut self.ledger,
                stable,
                amount_in,
                min_out,
                recipient,
                deadline,
                self.block,
            ),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        supply_desired: Wad,
        stable_desired: Wad,
        supply_min: Wad,
        stable_min: Wad,
        deadline: u64,
    ) -> Result<(Wad, Wad, Wad), KeelError> {
        record(
            "add_liquidity",
            self.amm.add_liquidity(
                ctx,
                &mut self.ledger,
                stable,
                supply_desired,
                stable_desired,
                supply_min,
                stable_min,
                deadline,
                self.block,
            ),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        lp_amount: Wad,
        supply_min: Wad,
        stable_min: Wad,
        deadline: u64,
    ) -> Result<(Wad, Wad), KeelError> {
        record(
            "remove_liquidity",
            self.amm.remove_liquidity(
                ctx,
                &mut self.ledger,
                stable,
                lp_amount,
                supply_min,
                stable_min,
                deadline,
                self.block,
            ),
        )
    }

    // ---- administration ----

    /// Hand the administrator capability for every component to a new
    /// identity in one step.
    pub fn transfer_admin(
        &mut self,
        ctx: &AuthContext,
        new_admin: AccountId,
    ) -> Result<(), KeelError> {
        let result = self.transfer_admin_inner(ctx, new_admin);
        record("transfer_admin", result)
    }

    fn transfer_admin_inner(
        &mut self,
        ctx: &AuthContext,
        new_admin: AccountId,
    ) -> Result<(), KeelError> {
        self.treasury.transfer_admin(ctx, new_admin)?;
        if self.exit.is_disabled() {
            self.exit.base_mut().transfer_admin(ctx, new_admin)?;
        } else {
            self.exit.transfer_admin(ctx, new_admin)?;
        }
        self.amm.transfer_admin(ctx, new_admin)
    }

    // ---- reads ----

    pub fn intrinsic_value_ratio(&self) -> Result<IvRatio, KeelError> {
        self.treasury.intrinsic_value_ratio()
    }

    pub fn harvested_rewards(&self) -> Wad {
        self.treasury.harvested_rewards()
    }

    pub fn pool_harvest_share(&self, account: AccountId) -> Option<u32> {
        self.treasury.pool_harvest_share(account)
    }

    pub fn allowance(&self, grantee: AccountId) -> Wad {
        self.treasury.allowance(grantee)
    }

    pub fn allocation(&self, strategy: AccountId) -> Option<Allocation> {
        self.treasury.allocation(strategy)
    }

    pub fn exit_entry(&self, holder: AccountId) -> Option<ExitEntry> {
        self.exit.base().exit_entry(holder).cloned()
    }

    pub fn claimable_epochs(&self, holder: AccountId) -> Vec<(u64, Wad)> {
        let now_epoch = self.exit.current_epoch(self.block);
        self.exit.base().claimable_epochs(holder, now_epoch)
    }

    /// The overlay-aware current epoch.
    pub fn current_epoch(&self) -> u64 {
        self.exit.current_epoch(self.block)
    }

    pub fn acceleration_policy(&self) -> Option<AccelerationPolicy> {
        self.exit.policy()
    }

    pub fn reserves(&self, stable: TokenId) -> Option<(Wad, Wad)> {
        self.amm.reserves(stable)
    }

    pub fn staked_of(&self, holder: AccountId) -> Wad {
        self.stake.staked_of(holder)
    }

    pub fn balance(&self, token: TokenId, account: AccountId) -> Wad {
        self.ledger.balance(token, account)
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn treasury(&self) -> &TreasuryEngine {
        &self.treasury
    }

    pub fn exit(&self) -> &AcceleratedExitQueue {
        &self.exit
    }

    pub fn amm(&self) -> &FloorAmm {
        &self.amm
    }

    pub fn stake_book(&self) -> &StakeBook {
        &self.stake
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Host-boundary access to the ledger, for endowing external accounts
    /// (the ledger stands in for the surrounding chain).
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}
