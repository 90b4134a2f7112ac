use super::{CreateOutcome, PoolEngine};
use crate::callbacks::CreateCallback;
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::ledger::{Calibration, Reserve};
use rmm_amm::{scale_by_liquidity, WAD};
use rmm_types::{mul_div, FixedPoint64x64, PoolId};
use tracing::debug;

impl PoolEngine {
    /// Initialize a pool for a new calibration
    ///
    /// The initial risky reserve per liquidity is `1 − delta`; the stable
    /// reserve is its replicating value at the full time to maturity. The
    /// creator funds both through `create_callback` and receives
    /// `liquidity − min_liquidity`; the floor stays in the pool unowned.
    ///
    /// # Arguments
    /// * `strike` - stable per risky, WAD-scaled
    /// * `sigma` - volatility, 10_000 = 100%
    /// * `maturity` - expiry timestamp, strictly in the future
    /// * `delta` - WAD fraction strictly between 0 and 1
    /// * `liquidity` - LP units to mint, above the minimum floor
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        caller: &dyn CreateCallback,
        strike: u128,
        sigma: u32,
        maturity: u64,
        delta: u128,
        liquidity: u128,
        data: &[u8],
    ) -> Result<CreateOutcome, EngineError> {
        self.execute("create", |tx| {
            let now = tx.now();
            if strike == 0 {
                return Err(EngineError::Calibration {
                    reason: "strike must be positive",
                });
            }
            if sigma == 0 {
                return Err(EngineError::Calibration {
                    reason: "volatility must be positive",
                });
            }
            if maturity <= now {
                return Err(EngineError::Calibration {
                    reason: "maturity must be in the future",
                });
            }
            if delta == 0 || delta >= WAD {
                return Err(EngineError::Calibration {
                    reason: "delta must be strictly between 0 and 1",
                });
            }
            if liquidity <= self.params.min_liquidity {
                return Err(EngineError::ZeroLiquidity);
            }

            let pool_id = PoolId::derive(self.address, maturity, sigma, strike);
            if tx.pool_exists(&pool_id) {
                return Err(EngineError::PoolDuplicate { pool_id });
            }

            let calibration = Calibration {
                strike,
                sigma,
                maturity,
                last_timestamp: now,
            };
            let curve = calibration.curve()?;
            let risky_per_liquidity = FixedPoint64x64::from_ratio(WAD - delta, WAD)?;
            let stable_per_liquidity =
                curve.stable_given_risky(FixedPoint64x64::ZERO, risky_per_liquidity)?;

            let delta_risky = mul_div(WAD - delta, liquidity, WAD)?;
            let delta_stable = scale_by_liquidity(stable_per_liquidity, liquidity)?;
            if delta_risky == 0 || delta_stable == 0 {
                return Err(EngineError::Calibration {
                    reason: "initial reserves round to zero",
                });
            }
            debug!(%pool_id, delta_risky, delta_stable, liquidity, "initial reserves");

            tx.request(delta_risky, delta_stable, |engine| {
                caller.create_callback(engine, delta_risky, delta_stable, data)
            })?;

            let creator = caller.address();
            let mut position = tx.position(creator, pool_id);
            position.allocate(liquidity - self.params.min_liquidity)?;

            tx.put_calibration(pool_id, calibration);
            tx.put_reserve(pool_id, Reserve::new(delta_risky, delta_stable, liquidity, now));
            tx.put_position(creator, pool_id, position);
            tx.emit(EngineEvent::Created {
                caller: creator,
                pool_id,
                strike,
                sigma,
                maturity,
                delta_risky,
                delta_stable,
            });

            Ok(CreateOutcome {
                pool_id,
                delta_risky,
                delta_stable,
                liquidity,
            })
        })
    }
}
