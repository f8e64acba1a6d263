// crates/keel-engine/src/lib.rs
//
// keel-engine: the caller-facing boundary of the Keel Protocol.
//
// A `KeelEngine` owns the ledger and all four components — treasury, stake
// book, exit queue (behind its acceleration overlay), and the floor AMM —
// and exposes every external write and read as one method. Each write is a
// sequential, atomic state transition; failures surface the error taxonomy
// kind alongside the operation name and leave state unchanged. The current
// block height is injected by the host and snapshotted per call.

pub mod engine;

pub use engine::{reserve_token, supply_token, EngineConfig, KeelEngine};
