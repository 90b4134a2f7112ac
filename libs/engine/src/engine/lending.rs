//! Borrowing against float
//!
//! A borrow removes liquidity from the reserves and records its collateral
//! on the borrower's position; a repay puts the liquidity back. In both
//! directions the tokens the reserves release are netted against the tokens
//! owed, and only the difference moves.

use super::transaction::{reserve_invariant, Transaction};
use super::{BorrowOutcome, PoolEngine, RepayOutcome, Settlement};
use crate::callbacks::BorrowCallback;
use crate::errors::EngineError;
use crate::events::{EngineEvent, PoolState};
use rmm_amm::WAD;
use rmm_types::{mul_div, mul_div_rounding_up, Address, PoolId};
use tracing::debug;

impl PoolEngine {
    /// Borrow `risky_collateral + stable_collateral / strike` liquidity
    ///
    /// The removed reserves are netted against the collateral: a surplus is
    /// paid or credited to the caller, a deficit is taken from margin or
    /// requested through `borrow_callback`.
    pub fn borrow(
        &self,
        caller: &dyn BorrowCallback,
        pool_id: PoolId,
        risky_collateral: u128,
        stable_collateral: u128,
        from_margin: bool,
        data: &[u8],
    ) -> Result<BorrowOutcome, EngineError> {
        self.execute("borrow", |tx| {
            let calibration = tx.calibration(&pool_id)?;
            let mut reserve = tx.reserve(&pool_id)?;

            let delta_liquidity =
                collateral_liquidity(risky_collateral, stable_collateral, calibration.strike)?;
            if delta_liquidity == 0 {
                return Err(EngineError::ZeroLiquidity);
            }
            if reserve.float < delta_liquidity {
                return Err(EngineError::InsufficientFloat {
                    available: reserve.float,
                    requested: delta_liquidity,
                });
            }

            let delta_risky = mul_div(delta_liquidity, reserve.reserve_risky, reserve.liquidity)?;
            let delta_stable = mul_div(delta_liquidity, reserve.reserve_stable, reserve.liquidity)?;

            let borrower = caller.address();
            let mut position = tx.position(borrower, pool_id);
            position.borrow(risky_collateral, stable_collateral)?;

            let curve = calibration.curve()?;
            let before = reserve_invariant(&curve, &reserve)?;
            reserve.borrow_float(delta_liquidity)?;
            reserve.remove(delta_risky, delta_stable, delta_liquidity, tx.now())?;
            let after = reserve_invariant(&curve, &reserve)?;
            tx.check_invariant(before, after)?;

            tx.put_position(borrower, pool_id, position);
            tx.put_reserve(pool_id, reserve);

            let settlement = Settlement::net(
                (risky_collateral, stable_collateral),
                (delta_risky, delta_stable),
            );
            debug!(%pool_id, delta_liquidity, delta_risky, delta_stable, ?settlement, "borrowed");

            if from_margin {
                tx.debit_margin(borrower, settlement.risky_deficit, settlement.stable_deficit)?;
                tx.credit_margin(borrower, settlement.risky_surplus, settlement.stable_surplus)?;
            } else {
                tx.pay(borrower, settlement.risky_surplus, settlement.stable_surplus)?;
                request_deficit(tx, &settlement, |engine| {
                    caller.borrow_callback(
                        engine,
                        settlement.risky_deficit,
                        settlement.stable_deficit,
                        data,
                    )
                })?;
            }

            tx.emit(EngineEvent::Borrowed {
                caller: borrower,
                pool_id,
                delta_liquidity,
                risky_collateral,
                stable_collateral,
                state: PoolState::new(&reserve, after),
            });
            Ok(BorrowOutcome {
                delta_liquidity,
                delta_risky,
                delta_stable,
                settlement,
            })
        })
    }

    /// Repay debt by re-allocating the liquidity behind `risky`/`stable` collateral
    ///
    /// Before maturity the caller repays their own position. Once the pool
    /// has expired anyone may repay the position of `recipient`, who receives
    /// any released surplus. The caller covers the deficit.
    #[allow(clippy::too_many_arguments)]
    pub fn repay(
        &self,
        caller: &dyn BorrowCallback,
        pool_id: PoolId,
        recipient: Address,
        risky_collateral: u128,
        stable_collateral: u128,
        from_margin: bool,
        data: &[u8],
    ) -> Result<RepayOutcome, EngineError> {
        self.execute("repay", |tx| {
            let calibration = tx.calibration(&pool_id)?;
            let mut reserve = tx.reserve(&pool_id)?;
            let payer = caller.address();
            let owner = if tx.now() > calibration.maturity {
                recipient
            } else {
                payer
            };

            let delta_liquidity =
                collateral_liquidity(risky_collateral, stable_collateral, calibration.strike)?;
            if delta_liquidity == 0 {
                return Err(EngineError::ZeroLiquidity);
            }
            if reserve.debt < delta_liquidity {
                return Err(EngineError::InsufficientDebt {
                    outstanding: reserve.debt,
                    requested: delta_liquidity,
                });
            }

            let delta_risky =
                mul_div_rounding_up(delta_liquidity, reserve.reserve_risky, reserve.liquidity)?;
            let delta_stable =
                mul_div_rounding_up(delta_liquidity, reserve.reserve_stable, reserve.liquidity)?;

            let mut position = tx.position(owner, pool_id);
            position.repay(owner, risky_collateral, stable_collateral)?;

            let curve = calibration.curve()?;
            let before = reserve_invariant(&curve, &reserve)?;
            reserve.allocate(delta_risky, delta_stable, delta_liquidity, tx.now())?;
            reserve.repay_float(delta_liquidity)?;
            let after = reserve_invariant(&curve, &reserve)?;
            tx.check_invariant(before, after)?;

            tx.put_position(owner, pool_id, position);
            tx.put_reserve(pool_id, reserve);

            let settlement = Settlement::net(
                (delta_risky, delta_stable),
                (risky_collateral, stable_collateral),
            );
            debug!(%pool_id, %owner, delta_liquidity, delta_risky, delta_stable, ?settlement, "repaid");

            if from_margin {
                tx.debit_margin(payer, settlement.risky_deficit, settlement.stable_deficit)?;
                tx.credit_margin(owner, settlement.risky_surplus, settlement.stable_surplus)?;
            } else {
                tx.pay(owner, settlement.risky_surplus, settlement.stable_surplus)?;
                request_deficit(tx, &settlement, |engine| {
                    caller.repay_callback(
                        engine,
                        settlement.risky_deficit,
                        settlement.stable_deficit,
                        data,
                    )
                })?;
            }

            tx.emit(EngineEvent::Repaid {
                caller: payer,
                owner,
                pool_id,
                delta_liquidity,
                risky_collateral,
                stable_collateral,
                state: PoolState::new(&reserve, after),
            });
            Ok(RepayOutcome {
                delta_liquidity,
                delta_risky,
                delta_stable,
                settlement,
            })
        })
    }
}

/// Liquidity equivalent of collateral: risky one-for-one, stable at the strike
fn collateral_liquidity(risky: u128, stable: u128, strike: u128) -> Result<u128, EngineError> {
    let stable_liquidity = mul_div(stable, WAD, strike)?;
    risky
        .checked_add(stable_liquidity)
        .ok_or(EngineError::overflow("collateral liquidity"))
}

fn request_deficit<F>(
    tx: &Transaction<'_>,
    settlement: &Settlement,
    invoke: F,
) -> Result<(), EngineError>
where
    F: FnOnce(&PoolEngine) -> anyhow::Result<()>,
{
    if !settlement.has_deficit() {
        return Ok(());
    }
    tx.request(settlement.risky_deficit, settlement.stable_deficit, invoke)
}
