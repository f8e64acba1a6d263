// crates/keel-treasury/src/lib.rs
//
// keel-treasury: intrinsic-value accounting for the Keel Protocol treasury.
//
// The treasury tracks the ratio of reserve-asset backing to committed supply
// (the intrinsic value, IV), mints supply into administrator-granted
// allowances, deploys reserve to external strategies, and recognizes IV
// growth as harvested rewards distributed pro-rata to registered pools.
//
// The ratio can never decrease except through an explicit, authorized
// `reset_iv`.

pub mod allocation;
pub mod pools;
pub mod treasury;

// Re-export key types for ergonomic access from downstream crates.
pub use allocation::{Allocation, AllocationBook};
pub use pools::{Pool, PoolRegistry};
pub use treasury::TreasuryEngine;
