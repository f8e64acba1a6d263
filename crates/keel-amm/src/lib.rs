// crates/keel-amm/src/lib.rs
//
// keel-amm: constant-product swaps between the supply token and stable
// assets, with a floor under the sell price.
//
// Every sell consults the treasury's intrinsic value ratio. A trade that
// would push the pool price below that ratio does not move the pool at all:
// it executes entirely at the intrinsic value price, paid from a dedicated
// defend reserve, so sellers are never filled below fundamental value and
// the pool's backing cannot be drained by arbitrage.

pub mod pair;
pub mod router;

// Re-export key types for ergonomic access from downstream crates.
pub use pair::Pair;
pub use router::{FloorAmm, SwapOutcome};
