use super::transaction::reserve_invariant;
use super::{PoolEngine, SwapOutcome};
use crate::callbacks::SwapCallback;
use crate::errors::EngineError;
use crate::events::{EngineEvent, PoolState};
use crate::params::BPS;
use rmm_amm::{per_liquidity, scale_by_liquidity, ReplicationCurve};
use rmm_types::{mul_div, FixedPoint64x64, PoolId};
use tracing::debug;

impl PoolEngine {
    /// Trade `delta_in` of one token for the other along the pool's curve
    ///
    /// The option is aged to the current time first. Only `gamma` of the
    /// input moves the curve; the full input lands in the reserves, so the
    /// fee accrues to liquidity providers as invariant growth. The output is
    /// paid to `caller` before the input is collected.
    pub fn swap(
        &self,
        caller: &dyn SwapCallback,
        pool_id: PoolId,
        risky_for_stable: bool,
        delta_in: u128,
        from_margin: bool,
        data: &[u8],
    ) -> Result<SwapOutcome, EngineError> {
        self.execute("swap", |tx| {
            if delta_in == 0 {
                return Err(EngineError::DeltaIn);
            }
            let mut calibration = tx.calibration(&pool_id)?;
            let mut reserve = tx.reserve(&pool_id)?;

            let now = tx.now();
            let grace_end = calibration
                .maturity
                .saturating_add(self.params.grace_period_secs);
            if now > grace_end {
                return Err(EngineError::PoolExpired {
                    maturity: calibration.maturity,
                    grace_end,
                    now,
                });
            }
            calibration.advance(now);

            let curve = calibration.curve()?;
            let invariant_before = reserve_invariant(&curve, &reserve)?;
            let effective_in = mul_div(delta_in, self.params.gamma_bps as u128, BPS as u128)?;

            let delta_out = if risky_for_stable {
                let risky = reserve
                    .reserve_risky
                    .checked_add(effective_in)
                    .ok_or(EngineError::overflow("swap input"))?;
                let stable_per_liquidity = curve.stable_given_risky(
                    invariant_before,
                    per_liquidity(risky, reserve.liquidity)?,
                )?;
                output(reserve.reserve_stable, stable_per_liquidity, reserve.liquidity)?
            } else {
                let stable = reserve
                    .reserve_stable
                    .checked_add(effective_in)
                    .ok_or(EngineError::overflow("swap input"))?;
                let stable_per_liquidity = per_liquidity(stable, reserve.liquidity)?;
                let estimate = curve.risky_given_stable(invariant_before, stable_per_liquidity)?;
                let risky_per_liquidity =
                    settle_risky(&curve, invariant_before, estimate, stable_per_liquidity)?;
                output(reserve.reserve_risky, risky_per_liquidity, reserve.liquidity)?
            };

            reserve.swap(risky_for_stable, delta_in, delta_out, now)?;
            let invariant_after = reserve_invariant(&curve, &reserve)?;
            tx.check_invariant(invariant_before, invariant_after)?;
            debug!(
                %pool_id,
                risky_for_stable,
                delta_in,
                delta_out,
                %invariant_before,
                %invariant_after,
                "swapped"
            );

            tx.put_calibration(pool_id, calibration);
            tx.put_reserve(pool_id, reserve);

            let trader = caller.address();
            let (risky_in, stable_in, risky_out, stable_out) = if risky_for_stable {
                (delta_in, 0, 0, delta_out)
            } else {
                (0, delta_in, delta_out, 0)
            };
            tx.pay(trader, risky_out, stable_out)?;
            if from_margin {
                tx.debit_margin(trader, risky_in, stable_in)?;
            } else {
                tx.request(risky_in, stable_in, |engine| {
                    caller.swap_callback(engine, risky_in, stable_in, data)
                })?;
            }

            tx.emit(EngineEvent::Swapped {
                caller: trader,
                pool_id,
                risky_for_stable,
                delta_in,
                delta_out,
                state: PoolState::new(&reserve, invariant_after),
            });
            Ok(SwapOutcome {
                delta_in,
                delta_out,
                invariant_before,
                invariant_after,
            })
        })
    }
}

/// Amount leaving a reserve whose new per-liquidity value is `next`
fn output(current: u128, next: FixedPoint64x64, liquidity: u128) -> Result<u128, EngineError> {
    if next.is_negative() {
        return Err(EngineError::DeltaOut);
    }
    let next = scale_by_liquidity(next, liquidity)?;
    match current.checked_sub(next) {
        Some(out) if out > 0 => Ok(out),
        _ => Err(EngineError::DeltaOut),
    }
}

/// Smallest risky per liquidity at or above `estimate` whose forward curve
/// value does not exceed `stable`
///
/// `risky_given_stable` chains the Φ⁻¹ and Φ approximations and can land
/// below the point the forward curve accepts. Gallop upward from the
/// estimate, then bisect back down to the boundary; `high` always satisfies
/// the bound, so the result never leaves the pool below its invariant.
fn settle_risky(
    curve: &ReplicationCurve,
    invariant_last: FixedPoint64x64,
    estimate: FixedPoint64x64,
    stable: FixedPoint64x64,
) -> Result<FixedPoint64x64, EngineError> {
    let fits = |risky: FixedPoint64x64| -> Result<bool, EngineError> {
        Ok(curve.stable_given_risky(invariant_last, risky)? <= stable)
    };

    let estimate = estimate.clamp(FixedPoint64x64::ZERO, FixedPoint64x64::ONE);
    if fits(estimate)? {
        return Ok(estimate);
    }

    let mut low = estimate;
    let mut step: i128 = 1;
    let mut high = loop {
        let candidate = FixedPoint64x64::from_raw(low.raw_value().saturating_add(step))
            .min(FixedPoint64x64::ONE);
        // y(1) = k, the lowest the curve goes
        if candidate == FixedPoint64x64::ONE || fits(candidate)? {
            break candidate;
        }
        low = candidate;
        step = step.saturating_mul(2);
    };

    while high.raw_value() - low.raw_value() > 1 {
        let mid = FixedPoint64x64::from_raw(
            low.raw_value() + (high.raw_value() - low.raw_value()) / 2,
        );
        if fits(mid)? {
            high = mid;
        } else {
            low = mid;
        }
    }
    Ok(high)
}
