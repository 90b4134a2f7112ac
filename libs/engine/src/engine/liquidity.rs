use super::transaction::reserve_invariant;
use super::{LiquidityOutcome, PoolEngine};
use crate::callbacks::LiquidityCallback;
use crate::errors::EngineError;
use crate::events::{EngineEvent, PoolState};
use rmm_types::{mul_div, mul_div_rounding_up, Address, PoolId};
use tracing::debug;

impl PoolEngine {
    /// Add `delta_liquidity` to `recipient`'s position
    ///
    /// Token amounts are proportional to the current reserves, rounded up.
    /// They come from the caller's margin when `from_margin` is set, otherwise
    /// through `allocate_callback`.
    pub fn allocate(
        &self,
        caller: &dyn LiquidityCallback,
        pool_id: PoolId,
        recipient: Address,
        delta_liquidity: u128,
        from_margin: bool,
        data: &[u8],
    ) -> Result<LiquidityOutcome, EngineError> {
        self.execute("allocate", |tx| {
            let calibration = tx.calibration(&pool_id)?;
            let mut reserve = tx.reserve(&pool_id)?;

            let delta_risky =
                mul_div_rounding_up(delta_liquidity, reserve.reserve_risky, reserve.liquidity)?;
            let delta_stable =
                mul_div_rounding_up(delta_liquidity, reserve.reserve_stable, reserve.liquidity)?;
            if delta_risky == 0 || delta_stable == 0 {
                return Err(EngineError::ZeroDeltas);
            }

            let mut position = tx.position(recipient, pool_id);
            if position.has_debt() {
                return Err(EngineError::PositionHasDebt { owner: recipient });
            }

            let curve = calibration.curve()?;
            let before = reserve_invariant(&curve, &reserve)?;
            position.allocate(delta_liquidity)?;
            reserve.allocate(delta_risky, delta_stable, delta_liquidity, tx.now())?;
            let after = reserve_invariant(&curve, &reserve)?;
            tx.check_invariant(before, after)?;
            debug!(%pool_id, delta_risky, delta_stable, delta_liquidity, "allocated");

            tx.put_position(recipient, pool_id, position);
            tx.put_reserve(pool_id, reserve);

            if from_margin {
                tx.debit_margin(caller.address(), delta_risky, delta_stable)?;
            } else {
                tx.request(delta_risky, delta_stable, |engine| {
                    caller.allocate_callback(engine, delta_risky, delta_stable, data)
                })?;
            }

            tx.emit(EngineEvent::Allocated {
                caller: caller.address(),
                recipient,
                pool_id,
                delta_risky,
                delta_stable,
                delta_liquidity,
                from_margin,
                state: PoolState::new(&reserve, after),
            });
            Ok(LiquidityOutcome {
                delta_risky,
                delta_stable,
                delta_liquidity,
            })
        })
    }

    /// Burn `delta_liquidity` of `caller`'s position into their margin
    ///
    /// Token amounts are proportional to the current reserves, rounded down.
    pub fn remove(
        &self,
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
    ) -> Result<LiquidityOutcome, EngineError> {
        self.execute("remove", |tx| {
            if delta_liquidity == 0 {
                return Err(EngineError::ZeroLiquidity);
            }
            let calibration = tx.calibration(&pool_id)?;
            let mut reserve = tx.reserve(&pool_id)?;

            let delta_risky = mul_div(delta_liquidity, reserve.reserve_risky, reserve.liquidity)?;
            let delta_stable = mul_div(delta_liquidity, reserve.reserve_stable, reserve.liquidity)?;
            if delta_risky == 0 && delta_stable == 0 {
                return Err(EngineError::ZeroDeltas);
            }

            let mut position = tx.position(caller, pool_id);
            position.remove(caller, delta_liquidity)?;

            let curve = calibration.curve()?;
            let before = reserve_invariant(&curve, &reserve)?;
            reserve.remove(delta_risky, delta_stable, delta_liquidity, tx.now())?;
            let after = reserve_invariant(&curve, &reserve)?;
            tx.check_invariant(before, after)?;
            debug!(%pool_id, delta_risky, delta_stable, delta_liquidity, "removed");

            tx.put_position(caller, pool_id, position);
            tx.put_reserve(pool_id, reserve);
            tx.credit_margin(caller, delta_risky, delta_stable)?;

            tx.emit(EngineEvent::Removed {
                caller,
                pool_id,
                delta_risky,
                delta_stable,
                delta_liquidity,
                state: PoolState::new(&reserve, after),
            });
            Ok(LiquidityOutcome {
                delta_risky,
                delta_stable,
                delta_liquidity,
            })
        })
    }

    /// Move `delta_liquidity` of `caller`'s position into lendable float
    pub fn supply(
        &self,
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
    ) -> Result<(), EngineError> {
        self.execute("supply", |tx| {
            if delta_liquidity == 0 {
                return Err(EngineError::ZeroLiquidity);
            }
            let mut reserve = tx.reserve(&pool_id)?;
            let mut position = tx.position(caller, pool_id);

            position.supply(caller, delta_liquidity)?;
            reserve.add_float(delta_liquidity)?;

            tx.put_position(caller, pool_id, position);
            tx.put_reserve(pool_id, reserve);
            tx.emit(EngineEvent::Supplied {
                caller,
                pool_id,
                delta_liquidity,
            });
            Ok(())
        })
    }

    /// Return `delta_liquidity` of `caller`'s float to plain liquidity
    ///
    /// Fails while that float is lent out.
    pub fn claim(
        &self,
        caller: Address,
        pool_id: PoolId,
        delta_liquidity: u128,
    ) -> Result<(), EngineError> {
        self.execute("claim", |tx| {
            if delta_liquidity == 0 {
                return Err(EngineError::ZeroLiquidity);
            }
            let mut reserve = tx.reserve(&pool_id)?;
            let mut position = tx.position(caller, pool_id);

            position.claim(caller, delta_liquidity)?;
            reserve.remove_float(delta_liquidity)?;

            tx.put_position(caller, pool_id, position);
            tx.put_reserve(pool_id, reserve);
            tx.emit(EngineEvent::Claimed {
                caller,
                pool_id,
                delta_liquidity,
            });
            Ok(())
        })
    }
}
