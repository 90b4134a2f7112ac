//! # Pool Engine
//!
//! Owns the ledger of every pool bound to one risky/stable token pair and
//! runs the ten mutating operations against it.
//!
//! ## Execution model
//!
//! Every mutating entry point runs through [`PoolEngine::execute`]:
//!
//! 1. Acquire the engine-wide [`ExecutionLock`]. A nested call from a
//!    callback fails with `EngineError::Reentrancy`.
//! 2. Compute deltas against a [`Transaction`] write set.
//! 3. Move tokens: payouts first, then callback requests whose effect is
//!    verified by re-reading balances.
//! 4. Commit the write set and token transfers, then publish events. Any
//!    error instead drops the transaction, which discards the write set and
//!    rolls back token transfers.
//!
//! All pools share one lock, so operations on unrelated pools serialize too.

mod create;
mod lending;
mod liquidity;
mod margin;
mod outcomes;
mod swap;
mod transaction;

pub use outcomes::{
    BorrowOutcome, CreateOutcome, LiquidityOutcome, RepayOutcome, Settlement, SwapOutcome,
};

use crate::clock::Clock;
use crate::errors::EngineError;
use crate::events::{EventSink, TracingSink};
use crate::ledger::{Calibration, LedgerState, Margin, Position, PositionKey, Reserve};
use crate::lock::ExecutionLock;
use crate::params::EngineParams;
use crate::token::Token;
use parking_lot::RwLock;
use rmm_types::{Address, FixedPoint64x64, PoolId};
use std::sync::Arc;
use tracing::{debug_span, warn};
use transaction::{reserve_invariant, Transaction};

pub struct PoolEngine {
    address: Address,
    risky: Arc<dyn Token>,
    stable: Arc<dyn Token>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    params: EngineParams,
    lock: ExecutionLock,
    state: RwLock<LedgerState>,
}

impl std::fmt::Debug for PoolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEngine")
            .field("address", &self.address)
            .field("risky", &self.risky.symbol())
            .field("stable", &self.stable.symbol())
            .field("params", &self.params)
            .field("locked", &self.lock.is_locked())
            .finish()
    }
}

impl PoolEngine {
    /// Engine at `address` trading `risky` against `stable`
    ///
    /// Uses default parameters and logs committed events through
    /// [`TracingSink`].
    pub fn new(
        address: Address,
        risky: Arc<dyn Token>,
        stable: Arc<dyn Token>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            risky,
            stable,
            clock,
            events: Arc::new(TracingSink),
            params: EngineParams::default(),
            lock: ExecutionLock::new(),
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn risky(&self) -> &dyn Token {
        self.risky.as_ref()
    }

    pub fn stable(&self) -> &dyn Token {
        self.stable.as_ref()
    }

    /// Whether a mutating operation is in progress
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Run `body` as one atomic operation
    fn execute<T, F>(&self, operation: &'static str, body: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, EngineError>,
    {
        let span = debug_span!("engine_op", operation);
        let _entered = span.enter();

        let result = Transaction::begin(self).and_then(|mut tx| {
            let output = body(&mut tx)?;
            tx.commit();
            Ok(output)
        });
        if let Err(error) = &result {
            warn!(operation, %error, "operation aborted");
        }
        result
    }

    // Views. These read committed state only.

    pub fn calibration(&self, pool_id: &PoolId) -> Result<Calibration, EngineError> {
        self.state
            .read()
            .calibrations
            .get(pool_id)
            .copied()
            .ok_or(EngineError::Uninitialized { pool_id: *pool_id })
    }

    pub fn reserve(&self, pool_id: &PoolId) -> Result<Reserve, EngineError> {
        self.state
            .read()
            .reserves
            .get(pool_id)
            .copied()
            .ok_or(EngineError::Uninitialized { pool_id: *pool_id })
    }

    /// Position of `owner` in `pool_id`, zeroed if never touched
    pub fn position(&self, owner: Address, pool_id: PoolId) -> Position {
        self.state
            .read()
            .positions
            .get(&PositionKey::new(owner, pool_id))
            .copied()
            .unwrap_or_default()
    }

    /// Margin of `owner`, zeroed if never touched
    pub fn margin(&self, owner: Address) -> Margin {
        self.state
            .read()
            .margins
            .get(&owner)
            .copied()
            .unwrap_or_default()
    }

    /// Every initialized pool, sorted
    pub fn pool_ids(&self) -> Vec<PoolId> {
        let mut ids: Vec<PoolId> = self.state.read().calibrations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Current invariant `k` per unit of liquidity
    ///
    /// Evaluated at the time to maturity as of the pool's last swap.
    pub fn invariant_of(&self, pool_id: &PoolId) -> Result<FixedPoint64x64, EngineError> {
        let (calibration, reserve) = self.pool(pool_id)?;
        reserve_invariant(&calibration.curve()?, &reserve)
    }

    /// Stable per liquidity on the pool's curve at `risky` per liquidity
    pub fn get_stable_given_risky(
        &self,
        pool_id: &PoolId,
        risky: FixedPoint64x64,
    ) -> Result<FixedPoint64x64, EngineError> {
        let (calibration, reserve) = self.pool(pool_id)?;
        let curve = calibration.curve()?;
        let invariant = reserve_invariant(&curve, &reserve)?;
        Ok(curve.stable_given_risky(invariant, risky)?)
    }

    /// Risky per liquidity on the pool's curve at `stable` per liquidity
    pub fn get_risky_given_stable(
        &self,
        pool_id: &PoolId,
        stable: FixedPoint64x64,
    ) -> Result<FixedPoint64x64, EngineError> {
        let (calibration, reserve) = self.pool(pool_id)?;
        let curve = calibration.curve()?;
        let invariant = reserve_invariant(&curve, &reserve)?;
        Ok(curve.risky_given_stable(invariant, stable)?)
    }

    fn pool(&self, pool_id: &PoolId) -> Result<(Calibration, Reserve), EngineError> {
        let state = self.state.read();
        let uninitialized = EngineError::Uninitialized { pool_id: *pool_id };
        match (state.calibrations.get(pool_id), state.reserves.get(pool_id)) {
            (Some(calibration), Some(reserve)) => Ok((*calibration, *reserve)),
            _ => Err(uninitialized),
        }
    }

    /// Serialize the four ledger maps
    pub fn export_state(&self) -> Result<Vec<u8>, EngineError> {
        let _guard = self.lock.acquire()?;
        Ok(bincode::serialize(&*self.state.read())?)
    }

    /// Replace the ledger with a snapshot from [`export_state`](Self::export_state)
    ///
    /// Token balances are not part of the snapshot.
    pub fn import_state(&self, snapshot: &[u8]) -> Result<(), EngineError> {
        let _guard = self.lock.acquire()?;
        let state: LedgerState = bincode::deserialize(snapshot)?;
        *self.state.write() = state;
        Ok(())
    }
}
