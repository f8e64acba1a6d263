// crates/keel-core/src/traits.rs
//
// Trait seams between Keel Protocol components.

use crate::error::KeelError;
use crate::ratio::IvRatio;

/// Read-side seam between the AMM and the treasury accounting engine.
///
/// The AMM consults the current intrinsic value ratio on every sell to
/// decide whether the trade must be clamped to the floor price. The ratio
/// is a synchronous snapshot taken at the start of the call.
pub trait IvOracle {
    /// The current recorded intrinsic value ratio.
    ///
    /// # Errors
    /// `NotSeeded` before the treasury has been seeded.
    fn intrinsic_value_ratio(&self) -> Result<IvRatio, KeelError>;
}
