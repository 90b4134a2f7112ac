//! Engine error taxonomy
//!
//! Every variant is fatal to the operation that raised it. The engine never
//! retries and never downgrades an error: the transaction is rolled back and
//! the caller must resubmit a corrected operation.

use rmm_amm::CurveError;
use rmm_types::{Address, FixedPoint64x64, FixedPointError, PoolId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Pool {pool_id} already exists")]
    PoolDuplicate { pool_id: PoolId },

    #[error("Pool {pool_id} is not initialized")]
    Uninitialized { pool_id: PoolId },

    #[error("Invalid calibration: {reason}")]
    Calibration { reason: &'static str },

    #[error("Token deltas are zero")]
    ZeroDeltas,

    #[error("Liquidity delta is zero")]
    ZeroLiquidity,

    #[error("Swap input is zero")]
    DeltaIn,

    #[error("Swap output is zero")]
    DeltaOut,

    #[error("Risky balance below requirement: expected at least {expected}, found {actual}")]
    RiskyBalance { expected: u128, actual: u128 },

    #[error("Stable balance below requirement: expected at least {expected}, found {actual}")]
    StableBalance { expected: u128, actual: u128 },

    #[error("Pool expired: maturity {maturity}, grace ends {grace_end}, now {now}")]
    PoolExpired {
        maturity: u64,
        grace_end: u64,
        now: u64,
    },

    #[error("Invariant decreased from {before} to {after}")]
    Invariant {
        before: FixedPoint64x64,
        after: FixedPoint64x64,
    },

    #[error("Margin of {owner} cannot cover {risky} risky and {stable} stable")]
    MarginUnderflow {
        owner: Address,
        risky: u128,
        stable: u128,
    },

    #[error("Engine is locked by an operation in progress")]
    Reentrancy,

    #[error("Insufficient float: {available} available, {requested} requested")]
    InsufficientFloat { available: u128, requested: u128 },

    #[error("Position {field} of {owner} is below {requested}")]
    PositionUnderflow {
        owner: Address,
        field: &'static str,
        requested: u128,
    },

    #[error("Insufficient debt: {outstanding} outstanding, {requested} requested")]
    InsufficientDebt { outstanding: u128, requested: u128 },

    #[error("Position of {owner} carries debt collateral")]
    PositionHasDebt { owner: Address },

    #[error("Transfer of {amount} {token} to {to} failed")]
    TransferFailed {
        token: String,
        to: Address,
        amount: u128,
    },

    #[error("Callback failed: {0:#}")]
    Callback(anyhow::Error),

    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    #[error("Invalid engine parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("State snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Math(#[from] FixedPointError),

    #[error(transparent)]
    Curve(#[from] CurveError),
}

impl EngineError {
    pub(crate) const fn overflow(operation: &'static str) -> Self {
        Self::ArithmeticOverflow { operation }
    }
}
