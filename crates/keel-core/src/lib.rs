// crates/keel-core/src/lib.rs
//
// keel-core: Core types, ledger, fixed-point math, and capability checks
// for the Keel Protocol.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the wad fixed-point amount type, the multi-token ledger,
// account identity and administrator capabilities, the protocol-wide error
// taxonomy, and the trait seams between components.

pub mod error;
pub(crate) mod hex;
pub mod identity;
pub mod ledger;
pub mod ratio;
pub mod traits;
pub mod wad;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use keel_core::Wad;`

pub use error::{ErrorKind, KeelError};
pub use identity::{AccountId, Admin, AuthContext};
pub use ledger::{Ledger, TokenId};
pub use ratio::IvRatio;
pub use traits::IvOracle;
pub use wad::{mul_div, Wad, U256, WAD};
