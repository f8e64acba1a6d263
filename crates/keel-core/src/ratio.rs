// crates/keel-core/src/ratio.rs
//
// The intrinsic value (IV) ratio: reserve-asset units backing each supply
// unit. Stored as an integer pair, never a float. Ratios are compared by
// cross-multiplying in 256 bits, so two ratios with different denominators
// compare exactly.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::KeelError;
use crate::wad::{mul_div, Wad, U256};

/// Reserve units per supply unit, as an exact integer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvRatio {
    /// Reserve-asset side of the ratio, in wad.
    pub reserve: Wad,
    /// Supply-token side of the ratio, in wad.
    pub supply: Wad,
}

impl IvRatio {
    pub fn new(reserve: Wad, supply: Wad) -> Self {
        Self { reserve, supply }
    }

    /// Compare `self.reserve / self.supply` against
    /// `other.reserve / other.supply` without division.
    pub fn cmp_ratio(&self, other: &IvRatio) -> Ordering {
        let lhs = U256::from(self.reserve) * U256::from(other.supply);
        let rhs = U256::from(other.reserve) * U256::from(self.supply);
        lhs.cmp(&rhs)
    }

    /// The higher of two ratios.
    pub fn max_ratio(self, other: IvRatio) -> IvRatio {
        if self.cmp_ratio(&other) == Ordering::Less {
            other
        } else {
            self
        }
    }

    /// Reserve value of `supply_amount` at this ratio, truncating.
    ///
    /// # Errors
    /// `Overflow` if the supply side of the ratio is zero or the value does
    /// not fit in a `Wad`.
    pub fn reserve_value(&self, supply_amount: Wad) -> Result<Wad, KeelError> {
        mul_div(supply_amount, self.reserve, self.supply)
    }

    /// Supply equivalent of `reserve_amount` at this ratio, truncating.
    ///
    /// # Errors
    /// `Overflow` if the reserve side of the ratio is zero or the value does
    /// not fit in a `Wad`.
    pub fn supply_value(&self, reserve_amount: Wad) -> Result<Wad, KeelError> {
        mul_div(reserve_amount, self.supply, self.reserve)
    }
}

impl fmt::Display for IvRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.reserve, self.supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wad::WAD;

    #[test]
    fn test_cmp_equal_ratios_different_scale() {
        let a = IvRatio::new(100 * WAD, 1000 * WAD);
        let b = IvRatio::new(10 * WAD, 100 * WAD);
        assert_eq!(a.cmp_ratio(&b), Ordering::Equal);
    }

    #[test]
    fn test_cmp_ordering() {
        let low = IvRatio::new(1 * WAD, 10 * WAD);
        let high = IvRatio::new(2 * WAD, 10 * WAD);
        assert_eq!(low.cmp_ratio(&high), Ordering::Less);
        assert_eq!(high.cmp_ratio(&low), Ordering::Greater);
    }

    #[test]
    fn test_max_ratio() {
        let low = IvRatio::new(1 * WAD, 10 * WAD);
        let high = IvRatio::new(3 * WAD, 10 * WAD);
        assert_eq!(low.max_ratio(high), high);
        assert_eq!(high.max_ratio(low), high);
    }

    #[test]
    fn test_reserve_value() {
        // 0.1 reserve per supply unit.
        let iv = IvRatio::new(100 * WAD, 1000 * WAD);
        assert_eq!(iv.reserve_value(50 * WAD).unwrap(), 5 * WAD);
    }

    #[test]
    fn test_supply_value() {
        let iv = IvRatio::new(100 * WAD, 1000 * WAD);
        assert_eq!(iv.supply_value(5 * WAD).unwrap(), 50 * WAD);
    }

    #[test]
    fn test_zero_supply_side_errors() {
        let iv = IvRatio::new(100 * WAD, 0);
        assert!(iv.reserve_value(WAD).is_err());
    }
}
