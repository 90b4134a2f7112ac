//! Transaction scope of one mutating operation
//!
//! A transaction holds the engine lock, a write set layered over the
//! committed ledger, token checkpoints and buffered events. Reads see the
//! write set first. `commit` folds the write set into the ledger and keeps
//! the token transfers; dropping an uncommitted transaction discards the
//! write set and rolls the transfers back.
//!
//! The committed ledger is only locked for the duration of a single read or
//! the final merge, never across a callback, so engine views called from a
//! callback see the last committed state.

use super::PoolEngine;
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::ledger::{Calibration, LedgerState, Margin, Position, PositionKey, Reserve};
use crate::lock::LockGuard;
use crate::token::Checkpoint;
use rmm_amm::{per_liquidity, ReplicationCurve};
use rmm_types::{Address, FixedPoint64x64, PoolId};
use tracing::debug;

pub(crate) struct Transaction<'e> {
    engine: &'e PoolEngine,
    now: u64,
    pending: LedgerState,
    events: Vec<EngineEvent>,
    risky_checkpoint: Checkpoint,
    stable_checkpoint: Checkpoint,
    committed: bool,
    // Dropped after `Drop::drop` has rolled back
    _guard: LockGuard<'e>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn begin(engine: &'e PoolEngine) -> Result<Self, EngineError> {
        let guard = engine.lock.acquire()?;
        Ok(Self {
            engine,
            now: engine.clock.now(),
            pending: LedgerState::default(),
            events: Vec::new(),
            risky_checkpoint: engine.risky.checkpoint(),
            stable_checkpoint: engine.stable.checkpoint(),
            committed: false,
            _guard: guard,
        })
    }

    /// Clock reading taken when the transaction began
    pub(crate) fn now(&self) -> u64 {
        self.now
    }

    pub(crate) fn pool_exists(&self, pool_id: &PoolId) -> bool {
        self.pending.calibrations.contains_key(pool_id)
            || self.engine.state.read().calibrations.contains_key(pool_id)
    }

    pub(crate) fn calibration(&self, pool_id: &PoolId) -> Result<Calibration, EngineError> {
        match self.pending.calibrations.get(pool_id) {
            Some(calibration) => Ok(*calibration),
            None => self
                .engine
                .state
                .read()
                .calibrations
                .get(pool_id)
                .copied()
                .ok_or(EngineError::Uninitialized { pool_id: *pool_id }),
        }
    }

    pub(crate) fn reserve(&self, pool_id: &PoolId) -> Result<Reserve, EngineError> {
        match self.pending.reserves.get(pool_id) {
            Some(reserve) => Ok(*reserve),
            None => self
                .engine
                .state
                .read()
                .reserves
                .get(pool_id)
                .copied()
                .ok_or(EngineError::Uninitialized { pool_id: *pool_id }),
        }
    }

    pub(crate) fn position(&self, owner: Address, pool_id: PoolId) -> Position {
        let key = PositionKey::new(owner, pool_id);
        match self.pending.positions.get(&key) {
            Some(position) => *position,
            None => self
                .engine
                .state
                .read()
                .positions
                .get(&key)
                .copied()
                .unwrap_or_default(),
        }
    }

    pub(crate) fn margin(&self, owner: Address) -> Margin {
        match self.pending.margins.get(&owner) {
            Some(margin) => *margin,
            None => self
                .engine
                .state
                .read()
                .margins
                .get(&owner)
                .copied()
                .unwrap_or_default(),
        }
    }

    pub(crate) fn put_calibration(&mut self, pool_id: PoolId, calibration: Calibration) {
        self.pending.calibrations.insert(pool_id, calibration);
    }

    pub(crate) fn put_reserve(&mut self, pool_id: PoolId, reserve: Reserve) {
        self.pending.reserves.insert(pool_id, reserve);
    }

    pub(crate) fn put_position(&mut self, owner: Address, pool_id: PoolId, position: Position) {
        self.pending
            .positions
            .insert(PositionKey::new(owner, pool_id), position);
    }

    pub(crate) fn credit_margin(
        &mut self,
        owner: Address,
        risky: u128,
        stable: u128,
    ) -> Result<(), EngineError> {
        let mut margin = self.margin(owner);
        margin.deposit(risky, stable)?;
        self.pending.margins.insert(owner, margin);
        Ok(())
    }

    pub(crate) fn debit_margin(
        &mut self,
        owner: Address,
        risky: u128,
        stable: u128,
    ) -> Result<(), EngineError> {
        let mut margin = self.margin(owner);
        margin.withdraw(owner, risky, stable)?;
        self.pending.margins.insert(owner, margin);
        Ok(())
    }

    /// Fail unless `after` is at least `before` minus the configured tolerance
    pub(crate) fn check_invariant(
        &self,
        before: FixedPoint64x64,
        after: FixedPoint64x64,
    ) -> Result<(), EngineError> {
        let floor = before.checked_sub(self.engine.params.invariant_tolerance)?;
        if after < floor {
            return Err(EngineError::Invariant { before, after });
        }
        Ok(())
    }

    /// Ask a callback for tokens, then verify they arrived
    ///
    /// The callback's own result only decides whether it failed; payment is
    /// judged solely by the engine's balances before and after.
    pub(crate) fn request<F>(
        &self,
        risky_due: u128,
        stable_due: u128,
        invoke: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&PoolEngine) -> anyhow::Result<()>,
    {
        let engine = self.engine;
        let risky_before = engine.risky.balance_of(engine.address);
        let stable_before = engine.stable.balance_of(engine.address);

        invoke(engine).map_err(EngineError::Callback)?;

        let risky_expected = risky_before
            .checked_add(risky_due)
            .ok_or(EngineError::overflow("risky balance check"))?;
        let risky_actual = engine.risky.balance_of(engine.address);
        if risky_actual < risky_expected {
            return Err(EngineError::RiskyBalance {
                expected: risky_expected,
                actual: risky_actual,
            });
        }

        let stable_expected = stable_before
            .checked_add(stable_due)
            .ok_or(EngineError::overflow("stable balance check"))?;
        let stable_actual = engine.stable.balance_of(engine.address);
        if stable_actual < stable_expected {
            return Err(EngineError::StableBalance {
                expected: stable_expected,
                actual: stable_actual,
            });
        }

        debug!(risky_due, stable_due, "callback payment verified");
        Ok(())
    }

    /// Transfer tokens out of the engine
    pub(crate) fn pay(&self, to: Address, risky: u128, stable: u128) -> Result<(), EngineError> {
        for (token, amount) in [(&self.engine.risky, risky), (&self.engine.stable, stable)] {
            if amount == 0 {
                continue;
            }
            if !token.transfer(self.engine.address, to, amount) {
                return Err(EngineError::TransferFailed {
                    token: token.symbol().to_string(),
                    to,
                    amount,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub(crate) fn commit(mut self) {
        let writes = std::mem::take(&mut self.pending);
        self.engine.state.write().merge(writes);
        self.engine.stable.commit(self.stable_checkpoint);
        self.engine.risky.commit(self.risky_checkpoint);
        self.committed = true;

        for event in std::mem::take(&mut self.events) {
            self.engine.events.publish(&event);
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.engine.stable.rollback(self.stable_checkpoint);
            self.engine.risky.rollback(self.risky_checkpoint);
        }
    }
}

/// Invariant `k` of a reserve on a curve, per unit of liquidity
pub(crate) fn reserve_invariant(
    curve: &ReplicationCurve,
    reserve: &Reserve,
) -> Result<FixedPoint64x64, EngineError> {
    let risky = per_liquidity(reserve.reserve_risky, reserve.liquidity)?;
    let stable = per_liquidity(reserve.reserve_stable, reserve.liquidity)?;
    Ok(curve.invariant(risky, stable)?)
}
