//! Runtime parameters of an engine instance

use crate::errors::EngineError;
use rmm_config::defaults::engine as defaults;
use rmm_config::EngineSettings;
use rmm_types::FixedPoint64x64;

/// Basis point denominator of `gamma_bps`
pub const BPS: u32 = defaults::BPS_DENOMINATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    /// Share of swap input that counts toward the curve, in basis points
    pub gamma_bps: u32,
    /// Seconds after maturity during which swaps are accepted
    pub grace_period_secs: u64,
    /// LP units locked on create
    pub min_liquidity: u128,
    /// Largest tolerated invariant regression
    pub invariant_tolerance: FixedPoint64x64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            gamma_bps: defaults::GAMMA_BPS,
            grace_period_secs: defaults::GRACE_PERIOD_SECS,
            min_liquidity: defaults::MIN_LIQUIDITY as u128,
            // 1e-9
            invariant_tolerance: FixedPoint64x64::from_raw(18_446_744_073),
        }
    }
}

impl TryFrom<&EngineSettings> for EngineParams {
    type Error = EngineError;

    fn try_from(settings: &EngineSettings) -> Result<Self, Self::Error> {
        if settings.gamma_bps == 0 || settings.gamma_bps > BPS {
            return Err(EngineError::InvalidParameter {
                reason: format!("gamma_bps must be in (0, {BPS}], got {}", settings.gamma_bps),
            });
        }
        let invariant_tolerance = FixedPoint64x64::from_decimal(settings.invariant_tolerance)?;
        if invariant_tolerance.is_negative() {
            return Err(EngineError::InvalidParameter {
                reason: format!(
                    "invariant_tolerance must not be negative, got {}",
                    settings.invariant_tolerance
                ),
            });
        }
        Ok(Self {
            gamma_bps: settings.gamma_bps,
            grace_period_secs: settings.grace_period_secs,
            min_liquidity: settings.min_liquidity as u128,
            invariant_tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_settings_match_default_params() {
        let params = EngineParams::try_from(&EngineSettings::default()).unwrap();
        assert_eq!(params, EngineParams::default());
    }

    #[test]
    fn test_rejects_bad_gamma() {
        let settings = EngineSettings {
            gamma_bps: 10_001,
            ..EngineSettings::default()
        };
        assert!(matches!(
            EngineParams::try_from(&settings),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_tolerance_from_settings() {
        let settings = EngineSettings {
            invariant_tolerance: dec!(0.5),
            ..EngineSettings::default()
        };
        let params = EngineParams::try_from(&settings).unwrap();
        assert_eq!(params.invariant_tolerance, FixedPoint64x64::HALF);

        let strict = EngineSettings {
            invariant_tolerance: dec!(0),
            ..EngineSettings::default()
        };
        assert_eq!(
            EngineParams::try_from(&strict).unwrap().invariant_tolerance,
            FixedPoint64x64::ZERO
        );

        let negative = EngineSettings {
            invariant_tolerance: dec!(-0.000001),
            ..EngineSettings::default()
        };
        assert!(matches!(
            EngineParams::try_from(&negative),
            Err(EngineError::InvalidParameter { .. })
        ));
    }
}
