//! Covered-call replication curve
//!
//! Reserves are normalized per unit of liquidity: `x` is risky per LP unit
//! (between 0 and 1) and `y` is stable per LP unit (between `k` and `K + k`).
//!
//! ```text
//! y(x) = K · Φ(Φ⁻¹(1 − x) − σ√τ) + k
//! x(y) = 1 − Φ(Φ⁻¹((y − k) / K) + σ√τ)
//! k    = y_actual − y(x_actual)   with k = 0 inside y(x)
//! ```
//!
//! All math runs in `FixedPoint64x64` so that any party recomputing the
//! invariant from the same reserves gets identical bits.

use crate::normal::NormalApprox;
use rmm_types::{FixedPoint64x64, FixedPointError};
use thiserror::Error;

type Fp = FixedPoint64x64;

/// Token amounts and strike carry 18 decimals
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Volatility and fee scale, 10_000 = 100%
pub const PERCENTAGE: u32 = 10_000;

/// Seconds per year used to annualize time to maturity
pub const YEAR: u64 = 31_556_952;

/// Errors from curve construction or evaluation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("Invalid calibration: {reason}")]
    InvalidCalibration { reason: &'static str },

    #[error(transparent)]
    Math(#[from] FixedPointError),
}

/// Replication curve for one calibration at one time to maturity
///
/// Construct a fresh curve whenever τ changes; construction does the
/// expensive `σ√τ` work once so repeated evaluations at the same τ are cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationCurve {
    strike: Fp,
    vol: Fp,
}

impl ReplicationCurve {
    /// # Arguments
    /// * `strike` - stable per risky, WAD-scaled
    /// * `sigma` - volatility scaled by [`PERCENTAGE`]
    /// * `tau` - seconds until maturity
    pub fn new(strike: u128, sigma: u32, tau: u64) -> Result<Self, CurveError> {
        if strike == 0 {
            return Err(CurveError::InvalidCalibration {
                reason: "strike must be positive",
            });
        }
        if sigma == 0 {
            return Err(CurveError::InvalidCalibration {
                reason: "volatility must be positive",
            });
        }

        let strike = Fp::from_ratio(strike, WAD)?;
        let sigma = Fp::from_ratio(sigma as u128, PERCENTAGE as u128)?;
        let tau_years = Fp::from_ratio(tau as u128, YEAR as u128)?;
        let vol = sigma.checked_mul(tau_years.sqrt()?)?;

        Ok(Self { strike, vol })
    }

    /// Strike as a 64.64 price
    pub fn strike(&self) -> Fp {
        self.strike
    }

    /// Proportional volatility `σ√τ` in years
    pub fn vol(&self) -> Fp {
        self.vol
    }

    /// Stable per liquidity that replicates `risky` per liquidity
    pub fn stable_given_risky(&self, invariant_last: Fp, risky: Fp) -> Result<Fp, CurveError> {
        if risky >= Fp::ONE {
            return Ok(invariant_last);
        }
        if risky <= Fp::ZERO {
            return Ok(self.strike.checked_add(invariant_last)?);
        }

        let phi = NormalApprox::inverse_cdf(Fp::ONE.checked_sub(risky)?)?;
        let cdf = NormalApprox::cdf(phi.checked_sub(self.vol)?)?;
        Ok(self.strike.checked_mul(cdf)?.checked_add(invariant_last)?)
    }

    /// Risky per liquidity that replicates `stable` per liquidity
    pub fn risky_given_stable(&self, invariant_last: Fp, stable: Fp) -> Result<Fp, CurveError> {
        let normalized = stable
            .checked_sub(invariant_last)?
            .checked_div(self.strike)?;
        if normalized <= Fp::ZERO {
            return Ok(Fp::ONE);
        }
        if normalized >= Fp::ONE {
            return Ok(Fp::ZERO);
        }

        let phi = NormalApprox::inverse_cdf(normalized)?;
        let cdf = NormalApprox::cdf(phi.checked_add(self.vol)?)?;
        Ok(Fp::ONE.checked_sub(cdf)?)
    }

    /// `k = stable − y(risky)`
    pub fn invariant(&self, risky: Fp, stable: Fp) -> Result<Fp, CurveError> {
        let replicated = self.stable_given_risky(Fp::ZERO, risky)?;
        Ok(stable.checked_sub(replicated)?)
    }
}

/// Absolute reserve divided by liquidity
pub fn per_liquidity(reserve: u128, liquidity: u128) -> Result<Fp, CurveError> {
    Ok(Fp::from_ratio(reserve, liquidity)?)
}

/// Per-liquidity value scaled back to token base units, truncated
pub fn scale_by_liquidity(value: Fp, liquidity: u128) -> Result<u128, CurveError> {
    Ok(value.mul_u128(liquidity)?)
}
