//! # RMM AMM Library - Replication Curve Mathematics
//!
//! ## Purpose
//!
//! Deterministic fixed-point math for a covered-call replicating market
//! maker: the normal CDF and inverse CDF approximations, and the replication
//! curve that maps one normalized reserve to the other and measures the pool
//! invariant.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Calibration (strike, volatility, maturity) and reserves
//!   from the pool engine ledger
//! - **Output Destinations**: Pool engine create/swap/invariant checks, views,
//!   simulator reporting
//! - **Precision**: `FixedPoint64x64` throughout, no floating point
//! - **Validation**: Every step is checked; errors surface as [`CurveError`]
//!
//! ## Architecture Role
//!
//! ```text
//! FixedPoint64x64 ──► NormalApprox ──► ReplicationCurve ──► PoolEngine
//! ```
//!
//! The engine builds a [`ReplicationCurve`] for the current time to maturity,
//! converts absolute reserves with [`per_liquidity`], and converts results
//! back with [`scale_by_liquidity`].

pub mod normal;
pub mod replication_math;

pub use normal::NormalApprox;
pub use replication_math::{
    per_liquidity, scale_by_liquidity, CurveError, ReplicationCurve, PERCENTAGE, WAD, YEAR,
};

/// Common types for curve calculations
pub use rmm_types::FixedPoint64x64;
