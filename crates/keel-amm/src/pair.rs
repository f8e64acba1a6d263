// crates/keel-amm/src/pair.rs
//
// One constant-product pool between the supply token and a stable asset.
//
// Reserves and LP shares are bookkeeping over the pair's custody account;
// the router performs the matching ledger transfers. Swap quotes hold
// `supply_reserve * stable_reserve` invariant; liquidity changes recompute
// it. All math runs through 256-bit intermediates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use keel_core::{
    mul_div,
    wad::{sqrt_product, U256},
    AccountId, KeelError, Wad,
};

/// A constant-product pool and its LP share book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    /// Custody account holding both sides of the pool.
    pub account: AccountId,
    pub supply_reserve: Wad,
    pub stable_reserve: Wad,
    /// Outstanding LP shares.
    pub lp_total: Wad,
    lp_balances: BTreeMap<AccountId, Wad>,
}

impl Pair {
    /// Create an empty pool custodied at `account`.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            supply_reserve: 0,
            stable_reserve: 0,
            lp_total: 0,
            lp_balances: BTreeMap::new(),
        }
    }

    /// The current product invariant.
    pub fn k(&self) -> U256 {
        U256::from(self.supply_reserve) * U256::from(self.stable_reserve)
    }

    /// Stable out for an exact supply amount in.
    ///
    /// # Errors
    /// `InvalidConfig` if the pool has no liquidity.
    pub fn quote_supply_in(&self, amount_in: Wad) -> Result<Wad, KeelError> {
        self.ensure_liquid()?;
        let denom = self
            .supply_reserve
            .checked_add(amount_in)
            .ok_or(KeelError::Overflow)?;
        mul_div(amount_in, self.stable_reserve, denom)
    }

    /// Supply out for an exact stable amount in.
    ///
    /// # Errors
    /// `InvalidConfig` if the pool has no liquidity.
    pub fn quote_stable_in(&self, amount_in: Wad) -> Result<Wad, KeelError> {
        self.ensure_liquid()?;
        let denom = self
            .stable_reserve
            .checked_add(amount_in)
            .ok_or(KeelError::Overflow)?;
        mul_div(amount_in, self.supply_reserve, denom)
    }

    /// Record an executed sell: supply in, stable out.
    pub fn apply_supply_in(&mut self, amount_in: Wad, amount_out: Wad) {
        self.supply_reserve += amount_in;
        self.stable_reserve -= amount_out;
    }

    /// Record an executed buy: stable in, supply out.
    pub fn apply_stable_in(&mut self, amount_in: Wad, amount_out: Wad) {
        self.stable_reserve += amount_in;
        self.supply_reserve -= amount_out;
    }

    /// Record a liquidity deposit and mint LP shares for `provider`.
    /// The first deposit mints `sqrt(supply * stable)` shares.
    ///
    /// # Errors
    /// `InvalidConfig` if the deposit would mint zero shares.
    pub fn deposit(
        &mut self,
        provider: AccountId,
        supply_amount: Wad,
        stable_amount: Wad,
    ) -> Result<Wad, KeelError> {
        let minted = if self.lp_total == 0 {
            sqrt_product(supply_amount, stable_amount)?
        } else {
            mul_div(supply_amount, self.lp_total, self.supply_reserve)?
                .min(mul_div(stable_amount, self.lp_total, self.stable_reserve)?)
        };
        if minted == 0 {
            return Err(KeelError::InvalidConfig(
                "deposit too small to mint a share".to_string(),
            ));
        }
        self.supply_reserve = self
            .supply_reserve
            .checked_add(supply_amount)
            .ok_or(KeelError::Overflow)?;
        self.stable_reserve = self
            .stable_reserve
            .checked_add(stable_amount)
            .ok_or(KeelError::Overflow)?;
        self.lp_total = self.lp_total.checked_add(minted).ok_or(KeelError::Overflow)?;
        let balance = self.lp_balances.entry(provider).or_insert(0);
        *balance = balance.checked_add(minted).ok_or(KeelError::Overflow)?;
        Ok(minted)
    }

    /// Burn `lp_amount` of the provider's shares and return the
    /// proportional `(supply_out, stable_out)`.
    ///
    /// # Errors
    /// `InsufficientBalance` if the provider holds fewer shares.
    pub fn withdraw(
        &mut self,
        provider: AccountId,
        lp_amount: Wad,
    ) -> Result<(Wad, Wad), KeelError> {
        let held = self.lp_balance(provider);
        if held < lp_amount {
            return Err(KeelError::InsufficientBalance {
                requested: lp_amount,
                available: held,
            });
        }
        let supply_out = mul_div(lp_amount, self.supply_reserve, self.lp_total)?;
        let stable_out = mul_div(lp_amount, self.stable_reserve, self.lp_total)?;
        self.lp_balances.insert(provider, held - lp_amount);
        self.lp_total -= lp_amount;
        self.supply_reserve -= supply_out;
        self.stable_reserve -= stable_out;
        Ok((supply_out, stable_out))
    }

    /// LP shares held by `account`.
    pub fn lp_balance(&self, account: AccountId) -> Wad {
        self.lp_balances.get(&account).copied().unwrap_or(0)
    }

    fn ensure_liquid(&self) -> Result<(), KeelError> {
        if self.supply_reserve == 0 || self.stable_reserve == 0 {
            return Err(KeelError::InvalidConfig(
                "pair has no liquidity".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::WAD;

    fn provider() -> AccountId {
        AccountId::from_label("provider")
    }

    fn seeded_pair() -> Pair {
        let mut pair = Pair::new(AccountId::from_label("pair"));
        pair.deposit(provider(), 1000 * WAD, 100 * WAD).unwrap();
        pair
    }

    #[test]
    fn test_first_deposit_mints_sqrt() {
        let pair = seeded_pair();
        // sqrt(1000 * 100) wad-scaled.
        assert_eq!(pair.lp_total, sqrt_product(1000 * WAD, 100 * WAD).unwrap());
        assert_eq!(pair.lp_balance(provider()), pair.lp_total);
    }

    #[test]
    fn test_quote_holds_product() {
        let pair = seeded_pair();
        let out = pair.quote_supply_in(100 * WAD).unwrap();
        // 100 * 100 / 1100 ≈ 9.0909...
        assert_eq!(out, mul_div(100 * WAD, 100 * WAD, 1100 * WAD).unwrap());
        // The post-trade product never drops below k.
        let post = U256::from(1100 * WAD) * U256::from(100 * WAD - out);
        assert!(post >= pair.k());
    }

    #[test]
    fn test_quote_empty_pool_rejected() {
        let pair = Pair::new(AccountId::from_label("pair"));
        assert!(pair.quote_supply_in(WAD).is_err());
        assert!(pair.quote_stable_in(WAD).is_err());
    }

    #[test]
    fn test_proportional_second_deposit() {
        let mut pair = seeded_pair();
        let lp_before = pair.lp_total;
        let minted = pair
            .deposit(AccountId::from_label("other"), 100 * WAD, 10 * WAD)
            .unwrap();
        // A 10% deposit mints 10% of the prior share supply.
        assert_eq!(minted, lp_before / 10);
    }

    #[test]
    fn test_withdraw_proportional() {
        let mut pair = seeded_pair();
        let half = pair.lp_total / 2;
        let (supply_out, stable_out) = pair.withdraw(provider(), half).unwrap();
        assert_eq!(supply_out, 500 * WAD);
        assert_eq!(stable_out, 50 * WAD);
        assert_eq!(pair.supply_reserve, 500 * WAD);
        assert_eq!(pair.stable_reserve, 50 * WAD);
    }

    #[test]
    fn test_withdraw_above_held_fails() {
        let mut pair = seeded_pair();
        let all = pair.lp_total;
        assert!(matches!(
            pair.withdraw(provider(), all + 1),
            Err(KeelError::InsufficientBalance { .. })
        ));
    }
}
