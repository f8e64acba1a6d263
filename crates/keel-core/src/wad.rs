// crates/keel-core/src/wad.rs
//
// Fixed-point amount arithmetic for the Keel Protocol.
//
// All token amounts are "wad" integers scaled to 18 decimal places
// (1 token = 10^18 wad). The product of two wads overflows u128, so every
// multiply-then-divide is routed through a 256-bit intermediate. No
// floating point ever touches protocol accounting.

use uint::construct_uint;

use crate::error::KeelError;

construct_uint! {
    /// 256-bit unsigned integer for overflow-safe intermediate products.
    pub struct U256(4);
}

/// Fixed-point token amount with 18 decimal places.
pub type Wad = u128;

/// Number of wad in one whole token. 1 token = 10^18 wad.
pub const WAD: Wad = 1_000_000_000_000_000_000;

/// Compute `a * b / denom` with a 256-bit intermediate, truncating toward zero.
///
/// # Errors
/// Returns `KeelError::Overflow` if `denom` is zero or the quotient does not
/// fit in a `Wad`.
pub fn mul_div(a: Wad, b: Wad, denom: Wad) -> Result<Wad, KeelError> {
    if denom == 0 {
        return Err(KeelError::Overflow);
    }
    let product = U256::from(a) * U256::from(b);
    let quotient = product / U256::from(denom);
    to_wad(quotient)
}

/// Integer square root of `a * b`, used for bootstrapping LP share supply.
pub fn sqrt_product(a: Wad, b: Wad) -> Result<Wad, KeelError> {
    let product = U256::from(a) * U256::from(b);
    to_wad(product.integer_sqrt())
}

/// Narrow a 256-bit value back to a `Wad`.
///
/// # Errors
/// Returns `KeelError::Overflow` if the value exceeds `u128::MAX`.
pub fn to_wad(value: U256) -> Result<Wad, KeelError> {
    if value > U256::from(u128::MAX) {
        return Err(KeelError::Overflow);
    }
    Ok(value.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_exact() {
        assert_eq!(mul_div(10 * WAD, 3, 5).unwrap(), 6 * WAD);
    }

    #[test]
    fn test_mul_div_truncates() {
        // 7 * 1 / 2 = 3 (truncated)
        assert_eq!(mul_div(7, 1, 2).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // a * b overflows u128 but the quotient fits.
        let a = u128::MAX / 2;
        assert_eq!(mul_div(a, 4, 4).unwrap(), a);
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert!(mul_div(1, 1, 0).is_err());
    }

    #[test]
    fn test_mul_div_quotient_overflow() {
        assert!(mul_div(u128::MAX, u128::MAX, 1).is_err());
    }

    #[test]
    fn test_sqrt_product() {
        assert_eq!(sqrt_product(4 * WAD, 9 * WAD).unwrap(), 6 * WAD);
        assert_eq!(sqrt_product(0, 9 * WAD).unwrap(), 0);
    }
}
