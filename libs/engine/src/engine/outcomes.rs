//! Typed results of committed operations

use rmm_types::{FixedPoint64x64, PoolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOutcome {
    pub pool_id: PoolId,
    pub delta_risky: u128,
    pub delta_stable: u128,
    /// Liquidity minted, including the locked floor
    pub liquidity: u128,
}

/// Token amounts moved by allocate or remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityOutcome {
    pub delta_risky: u128,
    pub delta_stable: u128,
    pub delta_liquidity: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub delta_in: u128,
    pub delta_out: u128,
    pub invariant_before: FixedPoint64x64,
    pub invariant_after: FixedPoint64x64,
}

/// Net token flow between the engine and a borrower
///
/// A deficit is owed to the engine, a surplus is owed by it. For each token
/// at most one of the two is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settlement {
    pub risky_deficit: u128,
    pub risky_surplus: u128,
    pub stable_deficit: u128,
    pub stable_surplus: u128,
}

impl Settlement {
    /// Net `owed` to the engine against `released` by it
    pub(crate) fn net(owed: (u128, u128), released: (u128, u128)) -> Self {
        Self {
            risky_deficit: owed.0.saturating_sub(released.0),
            risky_surplus: released.0.saturating_sub(owed.0),
            stable_deficit: owed.1.saturating_sub(released.1),
            stable_surplus: released.1.saturating_sub(owed.1),
        }
    }

    pub fn has_deficit(&self) -> bool {
        self.risky_deficit > 0 || self.stable_deficit > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowOutcome {
    pub delta_liquidity: u128,
    /// Tokens removed from the reserves
    pub delta_risky: u128,
    pub delta_stable: u128,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepayOutcome {
    pub delta_liquidity: u128,
    /// Tokens returned to the reserves
    pub delta_risky: u128,
    pub delta_stable: u128,
    pub settlement: Settlement,
}
