// crates/keel-amm/src/router.rs
//
// The floor-protected swap router.
//
// Buys are plain constant-product swaps. Sells are quoted on the curve
// first; if the post-trade pool price would sit below the treasury's
// intrinsic value ratio, the pool is left untouched and the entire fill
// executes at the intrinsic value price instead — the seller's supply goes
// to the treasury sink and the payout is drawn from the defend reserve in
// the configured defend stable. Liquidity provision is proportional with
// Uniswap-style optimal-amount resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use keel_core::{
    mul_div, wad::U256, AccountId, Admin, AuthContext, IvOracle, KeelError, Ledger, TokenId, Wad,
};

use crate::pair::Pair;

/// Result of a sell through the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    /// Stable amount paid to the recipient.
    pub amount_out: Wad,
    /// True when the fill executed at the intrinsic value price from the
    /// defend reserve instead of moving the pool.
    pub floor_defended: bool,
}

/// Constant-product router with an intrinsic-value price floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorAmm {
    admin: Admin,
    supply_token: TokenId,
    /// Sink for supply bought while defending the floor.
    treasury_account: AccountId,
    /// Token paid out on floor fills. Swappable by the administrator.
    defend_stable: TokenId,
    /// Custody account funding floor payouts.
    defend_account: AccountId,
    /// Pools keyed by their stable token.
    pairs: BTreeMap<TokenId, Pair>,
}

impl FloorAmm {
    pub fn new(
        admin: AccountId,
        supply_token: TokenId,
        defend_stable: TokenId,
        defend_account: AccountId,
        treasury_account: AccountId,
    ) -> Self {
        Self {
            admin: Admin::new(admin),
            supply_token,
            treasury_account,
            defend_stable,
            defend_account,
            pairs: BTreeMap::new(),
        }
    }

    // ---- administrator configuration ----

    /// Register a pool for `stable`, custodied at `pair_account`.
    ///
    /// # Errors
    /// `InvalidConfig` if a pair for the token already exists.
    pub fn add_pair(
        &mut self,
        ctx: &AuthContext,
        stable: TokenId,
        pair_account: AccountId,
    ) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "add_pair")?;
        if self.pairs.contains_key(&stable) {
            return Err(KeelError::InvalidConfig(format!(
                "pair for {} already registered",
                stable
            )));
        }
        self.pairs.insert(stable, Pair::new(pair_account));
        Ok(())
    }

    /// Swap the token used for floor payouts.
    pub fn set_defend_stable(&mut self, ctx: &AuthContext, token: TokenId) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_defend_stable")?;
        self.defend_stable = token;
        Ok(())
    }

    /// Point the router at a new treasury sink account.
    pub fn set_treasury(&mut self, ctx: &AuthContext, account: AccountId) -> Result<(), KeelError> {
        self.admin.ensure(ctx, "set_treasury")?;
        self.treasury_account = account;
        Ok(())
    }

    pub fn transfer_admin(
        &mut self,
        ctx: &AuthContext,
        new_admin: AccountId,
    ) -> Result<(), KeelError> {
        self.admin.transfer(ctx, new_admin)
    }

    // ---- swaps ----

    /// Sell an exact amount of supply for stable, never below the
    /// intrinsic value price.
    pub fn swap_exact_supply_for_stable(
        &mut self,
        ctx: &AuthContext,
        ledger: &mut Ledger,
        oracle: &impl IvOracle,
        stable: TokenId,
        amount_in: Wad,
        min_out: Wad,
        recipient: AccountId,
        deadline: u64,
        current_block: u64,
    ) -> Result<SwapOutcome, KeelError> {
        if current_block > deadline {
            return Err(KeelError::Expired);
        }
        if amount_in == 0 {
            return Err(KeelError::InvalidConfig(
                "swap amount must be greater than zero".to_string(),
            ));
        }
        let iv = oracle.intrinsic_value_ratio()?;
        let pair = self
            .pairs
            .get_mut(&stable)
            .ok_or_else(|| KeelError::UnknownPair(stable.to_string()))?;

        let curve_out = pair.quote_supply_in(amount_in)?;
        let post_supply = pair.supply_reserve + amount_in;
        let post_stable = pair.stable_reserve - curve_out;

        // Below-floor check: post_stable / post_supply < iv.reserve / iv.supply,
        // cross-multiplied in 256 bits.
        let below_floor = U256::from(post_stable) * U256::from(iv.supply)
            < U256::from(iv.reserve) * U256::from(post_supply);

        if !below_floor {
            if curve_out < min_out {
                return Err(KeelError::SlippageExceeded {
                    min_out,
                    out: curve_out,
                });
            }
            ledger.transfer(self.supply_token, ctx.caller, pair.account, amount_in)?;
            ledger.transfer(stable, pair.account, recipient, curve_out)?;
            pair.apply_supply_in(amount_in, curve_out);
            return Ok(SwapOutcome {
                amount_out: curve_out,
                floor_defended: false,
            });
        }

        // Floor fill: the whole trade executes at the intrinsic value price.
        // The pool does not move; the payout comes from the defend reserve
        // and the supply is routed to the treasury sink.
        let floor_out = iv.reserve_value(amount_in)?;
        if floor_out < min_out {
            return Err(KeelError::SlippageExceeded {
                min_out,
                out: floor_out,
            });
        }
        let defend_balance = ledger.balance(self.defend_stable, self.defend_account);
        if defend_balance < floor_out {
            return Err(KeelError::InsufficientBalance {
                requested: floor_out,
                available: defend_balance,
            });
        }
        ledger.transfer(self.supply_token, ctx.caller, self.treasury_account, amount_in)?;
        ledger.transfer(self.defend_stable, self.defend_account, recipient, floor_out)?;
        Ok(SwapOutcome {
            amount_out: floor_out,
            floor_defended: true,
        })
    }

    /// Buy supply with an exact amount of stable. No floor logic on the
    /// buy side.
    pub fn swap_exact_stable_for_supply(
        &mut self,
        ctx: &AuthContext,
        ledger: &mut Ledger,
        stable: TokenId,
        amount_in: Wad,
        min_out: Wad,
        recipient: AccountId,
        deadline: u64,
        current_block: u64,
    ) -> Result<Wad, KeelError> {
        if current_block > deadline {
            return Err(KeelError::Expired);
        }
        if amount_in == 0 {
            return Err(KeelError::InvalidConfig(
                "swap amount must be greater than zero".to_string(),
            ));
        }
        let pair = self
            .pairs
            .get_mut(&stable)
            .ok_or_else(|| KeelError::UnknownPair(stable.to_string()))?;

        let out = pair.quote_stable_in(amount_in)?;
        if out < min_out {
            return Err(KeelError::SlippageExceeded { min_out, out });
        }
        ledger.transfer(stable, ctx.caller, pair.account, amount_in)?;
        ledger.transfer(self.supply_token, pair.account, recipient, out)?;
        pair.apply_stable_in(amount_in, out);
        Ok(out)
    }

    // ---- liquidity ----

    /// Add liquidity at the current pool ratio. Returns
    /// `(supply_used, stable_used, lp_minted)`.
    ///
    /// # Errors
    /// `MevExtractable` if the amounts actually used would be less
    /// favorable than the caller's declared minimums.
    pub fn add_liquidity(
        &mut self,
        ctx: &AuthContext,
        ledger: &mut Ledger,
        stable: TokenId,
        supply_desired: Wad,
        stable_desired: Wad,
        supply_min: Wad,
        stable_min: Wad,
        deadline: u64,
        current_block: u64,
    ) -> Result<(Wad, Wad, Wad), KeelError> {
        if current_block > deadline {
            return Err(KeelError::Expired);
        }
        let pair = self
            .pairs
            .get_mut(&stable)
            .ok_or_else(|| KeelError::UnknownPair(stable.to_string()))?;

        let (supply_used, stable_used) = if pair.lp_total == 0 {
            if supply_desired == 0 || stable_desired == 0 {
                return Err(KeelError::InvalidConfig(
                    "initial liquidity requires both sides".to_string(),
                ));
            }
            (supply_desired, stable_desired)
        } else {
            let stable_optimal =
                mul_div(supply_desired, pair.stable_reserve, pair.supply_reserve)?;
            if stable_optimal <= stable_desired {
                if stable_optimal < stable_min {
                    return Err(KeelError::MevExtractable);
                }
                (supply_desired, stable_optimal)
            } else {
                let supply_optimal =
                    mul_div(stable_desired, pair.supply_reserve, pair.stable_reserve)?;
                if supply_optimal < supply_min {
                    return Err(KeelError::MevExtractable);
                }
                (supply_optimal, stable_desired)
            }
        };

        ledger.transfer(self.supply_token, ctx.caller, pair.account, supply_used)?;
        ledger.transfer(stable, ctx.caller, pair.account, stable_used)?;
        let minted = pair.deposit(ctx.caller, supply_used, stable_used)?;
        Ok((supply_used, stable_used, minted))
    }

    /// Burn LP shares and withdraw both sides proportionally. Returns
    /// `(supply_out, stable_out)`.
    pub fn remove_liquidity(
        &mut self,
        ctx: &AuthContext,
        ledger: &mut Ledger,
        stable: TokenId,
        lp_amount: Wad,
        supply_min: Wad,
        stable_min: Wad,
        deadline: u64,
        current_block: u64,
    ) -> Result<(Wad, Wad), KeelError> {
        if current_block > deadline {
            return Err(KeelError::Expired);
        }
        let pair = self
            .pairs
            .get_mut(&stable)
            .ok_or_else(|| KeelError::UnknownPair(stable.to_string()))?;

        // Quote before mutating so a slippage failure leaves the pool as-is.
        let supply_out = mul_div(lp_amount, pair.supply_reserve, pair.lp_total)?;
        let stable_out = mul_div(lp_amount, pair.stable_reserve, pair.lp_total)?;
        if supply_out < supply_min {
            return Err(KeelError::SlippageExceeded {
                min_out: supply_min,
                out: supply_out,
            });
        }
        if stable_out < stable_min {
            return Err(KeelError::SlippageExceeded {
                min_out: stable_min,
                out: stable_out,
            });
        }

        pair.withdraw(ctx.caller, lp_amount)?;
        ledger.transfer(self.supply_token, pair.account, ctx.caller, supply_out)?;
        ledger.transfer(stable, pair.account, ctx.caller, stable_out)?;
        Ok((supply_out, stable_out))
    }

    // ---- reads ----

    /// `(supply_reserve, stable_reserve)` for the pair, if registered.
    pub fn reserves(&self, stable: TokenId) -> Option<(Wad, Wad)> {
        self.pairs
            .get(&stable)
            .map(|p| (p.supply_reserve, p.stable_reserve))
    }

    /// The pair for `stable`, if registered.
    pub fn pair(&self, stable: TokenId) -> Option<&Pair> {
        self.pairs.get(&stable)
    }

    /// Token currently paid out on floor fills.
    pub fn defend_stable(&self) -> TokenId {
        self.defend_stable
    }

    /// Custody account funding floor payouts.
    pub fn defend_account(&self) -> AccountId {
        self.defend_account
    }

    pub fn admin(&self) -> AccountId {
        self.admin.current()
    }
}
