// crates/keel-core/src/error.rs
//
// Protocol-wide error types for the Keel Protocol.
//
// Every fallible operation across the workspace returns `KeelError`. Each
// variant maps onto one of four caller-facing kinds (`ErrorKind`): a failed
// capability check is fatal for the caller, invariant violations require a
// corrective action, temporal failures clear on their own as the clock
// advances, and slippage failures clear on re-quoting. All failures leave
// engine state unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::wad::Wad;

/// Caller-facing classification of a `KeelError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Capability check failed. Fatal for the caller, not retried.
    Unauthorized,
    /// Invariant violation. Recoverable by a corrective action
    /// (e.g. `reset_iv` after an intrinsic-value drop).
    Invariant,
    /// Too early or too late. Recoverable by waiting or re-submitting.
    Temporal,
    /// Execution would be worse than the caller's declared minimum.
    /// Recoverable by re-quoting.
    Slippage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Invariant => "invariant-violation",
            ErrorKind::Temporal => "temporal",
            ErrorKind::Slippage => "slippage",
        };
        write!(f, "{}", name)
    }
}

/// Protocol-wide error type for the Keel Protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeelError {
    /// Caller is not the active administrator for the component.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The treasury was already seeded; `seed` is a once-only operation.
    #[error("treasury already seeded")]
    AlreadySeeded,

    /// The treasury has not been seeded yet.
    #[error("treasury not seeded")]
    NotSeeded,

    /// Live intrinsic value is below the recorded baseline. Harvesting is
    /// blocked until an explicit `reset_iv` acknowledges the drop.
    #[error("intrinsic value dropped below recorded baseline; reset_iv required")]
    IvDropped,

    /// The pool at the given index does not match the supplied account.
    #[error("pool index {index} does not match the supplied account")]
    IndexMismatch { index: usize },

    /// Harvest shares must be greater than zero while a pool is registered.
    #[error("pool harvest share must be greater than zero")]
    ZeroShare,

    /// The requested epochs yielded nothing to restake.
    #[error("nothing to stake for the requested epochs")]
    NothingToStake,

    /// The requested epochs yielded nothing to withdraw.
    #[error("nothing to withdraw for the requested epochs")]
    NothingToWithdraw,

    /// The epoch is not yet closed; only past epochs are claimable.
    #[error("epoch {epoch} has not been processed yet")]
    NotYetProcessed { epoch: u64 },

    /// The transaction deadline has passed.
    #[error("deadline expired")]
    Expired,

    /// Executing at current reserves would be less favorable than the
    /// caller's declared minimums.
    #[error("execution less favorable than declared minimums")]
    MevExtractable,

    /// Output is below the caller's minimum.
    #[error("output {out} below minimum {min_out}")]
    SlippageExceeded { min_out: Wad, out: Wad },

    /// The acceleration overlay has been permanently disabled.
    #[error("acceleration overlay is disabled")]
    AccelerationDisabled,

    /// Account balance is insufficient for the requested movement.
    #[error("insufficient balance: requested {requested} wad but only {available} wad available")]
    InsufficientBalance { requested: Wad, available: Wad },

    /// Mint allowance is insufficient for the requested drawdown.
    #[error("insufficient allowance: requested {requested} wad but only {available} wad granted")]
    InsufficientAllowance { requested: Wad, available: Wad },

    /// The token is not registered on the ledger.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    /// No allocation record exists for the strategy.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// No pair is registered for the stable token.
    #[error("unknown pair: {0}")]
    UnknownPair(String),

    /// A configuration parameter is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Arithmetic overflow or division by zero.
    #[error("arithmetic overflow")]
    Overflow,
}

impl KeelError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeelError::Unauthorized(_) | KeelError::AccelerationDisabled => {
                ErrorKind::Unauthorized
            }
            KeelError::NotYetProcessed { .. } | KeelError::Expired => ErrorKind::Temporal,
            KeelError::MevExtractable | KeelError::SlippageExceeded { .. } => ErrorKind::Slippage,
            _ => ErrorKind::Invariant,
        }
    }
}
