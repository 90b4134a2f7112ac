//! Callback collaborators
//!
//! Operations that pull tokens into the engine do it in two steps: the engine
//! requests the pending deltas from a callback, then re-reads its own token
//! balances and aborts if they did not grow by at least the requested amount.
//! What a callback returns is never taken as proof of payment.
//!
//! Callbacks run while the engine lock is held. They may read engine views,
//! but any mutating call fails with `EngineError::Reentrancy`.

use crate::engine::PoolEngine;
use rmm_types::Address;

/// Identity of the party driving an operation
pub trait Account {
    fn address(&self) -> Address;
}

pub trait CreateCallback: Account {
    fn create_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;
}

/// Funds margin deposits
pub trait DepositCallback: Account {
    fn deposit_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;
}

/// Funds liquidity allocation
pub trait LiquidityCallback: Account {
    fn allocate_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;
}

/// Pays swap input; exactly one delta is non-zero
pub trait SwapCallback: Account {
    fn swap_callback(
        &self,
        engine: &PoolEngine,
        delta_risky: u128,
        delta_stable: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;
}

/// Covers collateral deficits of borrow and repay
pub trait BorrowCallback: Account {
    fn borrow_callback(
        &self,
        engine: &PoolEngine,
        risky_deficit: u128,
        stable_deficit: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;

    fn repay_callback(
        &self,
        engine: &PoolEngine,
        risky_deficit: u128,
        stable_deficit: u128,
        data: &[u8],
    ) -> anyhow::Result<()>;
}
