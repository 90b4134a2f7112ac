//! # RMM Engine - Replication-Invariant Pool Engine
//!
//! ## Purpose
//!
//! Ledger-resident market maker whose pools replicate a covered call. Liquidity
//! providers fund pools, traders swap risky against stable along the
//! replication curve, and liquidity supplied as float can be borrowed against
//! collateral.
//!
//! ## Integration Points
//!
//! - **Tokens**: [`Token`] balances and outgoing transfers, with checkpoints
//!   standing in for host transaction atomicity
//! - **Callbacks**: [`CreateCallback`], [`DepositCallback`],
//!   [`LiquidityCallback`], [`SwapCallback`], [`BorrowCallback`] move tokens
//!   into the engine and are verified, never trusted
//! - **Time**: [`Clock`]
//! - **Events**: committed operations are published to an [`EventSink`]
//! - **Configuration**: [`EngineParams`] converts from `rmm_config::EngineSettings`
//!
//! ## Architecture Role
//!
//! ```text
//! caller ──► PoolEngine ──► ReplicationCurve (deltas, invariant)
//!               │
//!               ├──► LedgerState (calibrations, reserves, positions, margins)
//!               ├──► callback ──► Token balances re-read and verified
//!               └──► EventSink (after commit)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rmm_engine::{InMemoryToken, ManualClock, PoolEngine};
//! use rmm_types::Address;
//! use std::sync::Arc;
//!
//! let engine = PoolEngine::new(
//!     Address::from_label("engine"),
//!     Arc::new(InMemoryToken::new("RISKY")),
//!     Arc::new(InMemoryToken::new("STABLE")),
//!     Arc::new(ManualClock::new(1_700_000_000)),
//! );
//! assert!(engine.pool_ids().is_empty());
//! assert!(!engine.is_locked());
//! ```

pub mod callbacks;
pub mod clock;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod lock;
pub mod params;
pub mod token;

pub use callbacks::{
    Account, BorrowCallback, CreateCallback, DepositCallback, LiquidityCallback, SwapCallback,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    BorrowOutcome, CreateOutcome, LiquidityOutcome, PoolEngine, RepayOutcome, Settlement,
    SwapOutcome,
};
pub use errors::EngineError;
pub use events::{EngineEvent, EventSink, PoolState, RecordingSink, TracingSink};
pub use ledger::{Calibration, LedgerState, Margin, Position, PositionKey, Reserve};
pub use lock::ExecutionLock;
pub use params::EngineParams;
pub use token::{Checkpoint, InMemoryToken, Token};
