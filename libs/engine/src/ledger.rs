//! Ledger entities owned by the pool engine
//!
//! Four keyed maps make up the whole persisted state:
//!
//! | Map | Key | Value |
//! |---|---|---|
//! | calibrations | `PoolId` | [`Calibration`] |
//! | reserves | `PoolId` | [`Reserve`] |
//! | positions | [`PositionKey`] | [`Position`] |
//! | margins | `Address` | [`Margin`] |
//!
//! The mutators here only enforce per-entity arithmetic (no underflow, no
//! overflow). Cross-entity rules live in the engine operations.

use crate::errors::EngineError;
use rmm_amm::{CurveError, ReplicationCurve};
use rmm_types::{Address, PoolId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable pricing parameters of a pool, plus the swap clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    /// Stable per risky, WAD-scaled
    pub strike: u128,
    /// Volatility, 10_000 = 100%
    pub sigma: u32,
    /// Expiry timestamp in seconds
    pub maturity: u64,
    /// Last time the option was aged by a swap
    pub last_timestamp: u64,
}

impl Calibration {
    /// Seconds to maturity as of `last_timestamp`
    pub fn tau(&self) -> u64 {
        self.maturity.saturating_sub(self.last_timestamp)
    }

    /// Replication curve at the current `tau`
    pub fn curve(&self) -> Result<ReplicationCurve, CurveError> {
        ReplicationCurve::new(self.strike, self.sigma, self.tau())
    }

    /// Age the option to `now`, never moving backwards or past maturity
    pub fn advance(&mut self, now: u64) {
        self.last_timestamp = self.last_timestamp.max(now.min(self.maturity));
    }
}

/// Aggregate pool reserves and lending state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub reserve_risky: u128,
    pub reserve_stable: u128,
    /// Total LP units backed by the reserves, including float and the locked floor
    pub liquidity: u128,
    /// Liquidity supplied for lending and not yet borrowed
    pub float: u128,
    /// Liquidity removed by borrowers and owed back
    pub debt: u128,
    /// Time-weighted sums, accrued on every reserve mutation
    pub cumulative_risky: u128,
    pub cumulative_stable: u128,
    pub cumulative_liquidity: u128,
    pub last_timestamp: u64,
}

impl Reserve {
    pub fn new(reserve_risky: u128, reserve_stable: u128, liquidity: u128, now: u64) -> Self {
        Self {
            reserve_risky,
            reserve_stable,
            liquidity,
            last_timestamp: now,
            ..Self::default()
        }
    }

    /// Accrue the time-weighted accumulators up to `now`
    ///
    /// Accumulators wrap; consumers diff two observations.
    fn accrue(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_timestamp) as u128;
        if elapsed > 0 {
            self.cumulative_risky = self
                .cumulative_risky
                .wrapping_add(self.reserve_risky.wrapping_mul(elapsed));
            self.cumulative_stable = self
                .cumulative_stable
                .wrapping_add(self.reserve_stable.wrapping_mul(elapsed));
            self.cumulative_liquidity = self
                .cumulative_liquidity
                .wrapping_add(self.liquidity.wrapping_mul(elapsed));
            self.last_timestamp = now;
        }
    }

    pub fn allocate(
        &mut self,
        delta_risky: u128,
        delta_stable: u128,
        delta_liquidity: u128,
        now: u64,
    ) -> Result<(), EngineError> {
        self.accrue(now);
        self.reserve_risky = add(self.reserve_risky, delta_risky, "reserve allocate")?;
        self.reserve_stable = add(self.reserve_stable, delta_stable, "reserve allocate")?;
        self.liquidity = add(self.liquidity, delta_liquidity, "reserve allocate")?;
        Ok(())
    }

    pub fn remove(
        &mut self,
        delta_risky: u128,
        delta_stable: u128,
        delta_liquidity: u128,
        now: u64,
    ) -> Result<(), EngineError> {
        self.accrue(now);
        self.reserve_risky = sub(self.reserve_risky, delta_risky, "reserve remove")?;
        self.reserve_stable = sub(self.reserve_stable, delta_stable, "reserve remove")?;
        self.liquidity = sub(self.liquidity, delta_liquidity, "reserve remove")?;
        Ok(())
    }

    /// Apply a swap: input side grows by the full `delta_in`
    pub fn swap(
        &mut self,
        risky_for_stable: bool,
        delta_in: u128,
        delta_out: u128,
        now: u64,
    ) -> Result<(), EngineError> {
        self.accrue(now);
        if risky_for_stable {
            self.reserve_risky = add(self.reserve_risky, delta_in, "reserve swap")?;
            self.reserve_stable = sub(self.reserve_stable, delta_out, "reserve swap")?;
        } else {
            self.reserve_stable = add(self.reserve_stable, delta_in, "reserve swap")?;
            self.reserve_risky = sub(self.reserve_risky, delta_out, "reserve swap")?;
        }
        Ok(())
    }

    pub fn add_float(&mut self, delta_liquidity: u128) -> Result<(), EngineError> {
        self.float = add(self.float, delta_liquidity, "reserve float")?;
        Ok(())
    }

    pub fn remove_float(&mut self, delta_liquidity: u128) -> Result<(), EngineError> {
        self.float = self
            .float
            .checked_sub(delta_liquidity)
            .ok_or(EngineError::InsufficientFloat {
                available: self.float,
                requested: delta_liquidity,
            })?;
        Ok(())
    }

    /// Move float into debt
    pub fn borrow_float(&mut self, delta_liquidity: u128) -> Result<(), EngineError> {
        self.remove_float(delta_liquidity)?;
        self.debt = add(self.debt, delta_liquidity, "reserve debt")?;
        Ok(())
    }

    /// Move debt back into float
    pub fn repay_float(&mut self, delta_liquidity: u128) -> Result<(), EngineError> {
        self.debt = self
            .debt
            .checked_sub(delta_liquidity)
            .ok_or(EngineError::InsufficientDebt {
                outstanding: self.debt,
                requested: delta_liquidity,
            })?;
        self.float = add(self.float, delta_liquidity, "reserve float")?;
        Ok(())
    }
}

/// Composite key of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub owner: Address,
    pub pool_id: PoolId,
}

impl PositionKey {
    pub fn new(owner: Address, pool_id: PoolId) -> Self {
        Self { owner, pool_id }
    }
}

/// One owner's stake in one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Plain LP units, removable at any time
    pub liquidity: u128,
    /// LP units supplied for lending
    pub float: u128,
    pub risky_collateral: u128,
    pub stable_collateral: u128,
}

impl Position {
    pub fn has_debt(&self) -> bool {
        self.risky_collateral > 0 || self.stable_collateral > 0
    }

    pub fn allocate(&mut self, delta_liquidity: u128) -> Result<(), EngineError> {
        self.liquidity = add(self.liquidity, delta_liquidity, "position allocate")?;
        Ok(())
    }

    pub fn remove(&mut self, owner: Address, delta_liquidity: u128) -> Result<(), EngineError> {
        self.liquidity = debit(self.liquidity, delta_liquidity, owner, "liquidity")?;
        Ok(())
    }

    /// Lock plain liquidity as lendable float
    pub fn supply(&mut self, owner: Address, delta_liquidity: u128) -> Result<(), EngineError> {
        self.liquidity = debit(self.liquidity, delta_liquidity, owner, "liquidity")?;
        self.float = add(self.float, delta_liquidity, "position supply")?;
        Ok(())
    }

    /// Return float to plain liquidity
    pub fn claim(&mut self, owner: Address, delta_liquidity: u128) -> Result<(), EngineError> {
        self.float = debit(self.float, delta_liquidity, owner, "float")?;
        self.liquidity = add(self.liquidity, delta_liquidity, "position claim")?;
        Ok(())
    }

    pub fn borrow(&mut self, risky: u128, stable: u128) -> Result<(), EngineError> {
        self.risky_collateral = add(self.risky_collateral, risky, "position borrow")?;
        self.stable_collateral = add(self.stable_collateral, stable, "position borrow")?;
        Ok(())
    }

    pub fn repay(&mut self, owner: Address, risky: u128, stable: u128) -> Result<(), EngineError> {
        self.risky_collateral = debit(self.risky_collateral, risky, owner, "risky collateral")?;
        self.stable_collateral = debit(self.stable_collateral, stable, owner, "stable collateral")?;
        Ok(())
    }
}

/// Internal token balances of one owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub balance_risky: u128,
    pub balance_stable: u128,
}

impl Margin {
    pub fn deposit(&mut self, risky: u128, stable: u128) -> Result<(), EngineError> {
        self.balance_risky = add(self.balance_risky, risky, "margin deposit")?;
        self.balance_stable = add(self.balance_stable, stable, "margin deposit")?;
        Ok(())
    }

    /// Debit both balances or neither
    pub fn withdraw(&mut self, owner: Address, risky: u128, stable: u128) -> Result<(), EngineError> {
        match (
            self.balance_risky.checked_sub(risky),
            self.balance_stable.checked_sub(stable),
        ) {
            (Some(balance_risky), Some(balance_stable)) => {
                self.balance_risky = balance_risky;
                self.balance_stable = balance_stable;
                Ok(())
            }
            _ => Err(EngineError::MarginUnderflow {
                owner,
                risky,
                stable,
            }),
        }
    }
}

/// The engine's complete persisted state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub calibrations: HashMap<PoolId, Calibration>,
    pub reserves: HashMap<PoolId, Reserve>,
    pub positions: HashMap<PositionKey, Position>,
    pub margins: HashMap<Address, Margin>,
}

impl LedgerState {
    /// Overwrite entries with those of `writes`
    pub fn merge(&mut self, writes: LedgerState) {
        self.calibrations.extend(writes.calibrations);
        self.reserves.extend(writes.reserves);
        self.positions.extend(writes.positions);
        self.margins.extend(writes.margins);
    }

    pub fn is_empty(&self) -> bool {
        self.calibrations.is_empty()
            && self.reserves.is_empty()
            && self.positions.is_empty()
            && self.margins.is_empty()
    }
}

fn add(a: u128, b: u128, operation: &'static str) -> Result<u128, EngineError> {
    a.checked_add(b).ok_or(EngineError::overflow(operation))
}

fn sub(a: u128, b: u128, operation: &'static str) -> Result<u128, EngineError> {
    a.checked_sub(b).ok_or(EngineError::overflow(operation))
}

fn debit(
    balance: u128,
    amount: u128,
    owner: Address,
    field: &'static str,
) -> Result<u128, EngineError> {
    balance
        .checked_sub(amount)
        .ok_or(EngineError::PositionUnderflow {
            owner,
            field,
            requested: amount,
        })
}
