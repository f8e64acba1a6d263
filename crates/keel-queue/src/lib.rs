// crates/keel-queue/src/lib.rs
//
// keel-queue: epoch-batched redemption scheduling for the Keel Protocol.
//
// Large redemptions are spread across future epochs so that outflow never
// exceeds a per-epoch cap. The exit queue assigns each join to a window of
// epochs bounded by global and per-address caps; closed epochs can be
// withdrawn or restaked. The acceleration overlay can compress the epoch
// timeline by a configured factor and can be permanently disabled, handing
// scheduling authority back to the base queue.

pub mod acceleration;
pub mod queue;
pub mod stake;

// Re-export key types for ergonomic access from downstream crates.
pub use acceleration::{AccelerationPolicy, AcceleratedExitQueue};
pub use queue::{ExitEntry, ExitQueue};
pub use stake::StakeBook;
