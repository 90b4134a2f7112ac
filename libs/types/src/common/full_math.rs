//! Overflow-free `a * b / c` on `u128` token amounts
//!
//! Ledger arithmetic multiplies two 18-decimal quantities before dividing, so
//! the product is formed in 256 bits and only the quotient has to fit.

use crate::common::errors::FixedPointError;
use ethnum::U256;

/// `a * b / denominator`, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, FixedPointError> {
    if denominator == 0 {
        return Err(FixedPointError::DivisionByZero);
    }
    let quotient = U256::new(a) * U256::new(b) / U256::new(denominator);
    narrow(quotient, "mul_div")
}

/// `a * b / denominator`, rounded up
pub fn mul_div_rounding_up(a: u128, b: u128, denominator: u128) -> Result<u128, FixedPointError> {
    if denominator == 0 {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = U256::new(a) * U256::new(b);
    let denominator = U256::new(denominator);
    let mut quotient = product / denominator;
    if product % denominator != U256::ZERO {
        quotient += U256::ONE;
    }
    narrow(quotient, "mul_div_rounding_up")
}

fn narrow(value: U256, operation: &'static str) -> Result<u128, FixedPointError> {
    if value > U256::new(u128::MAX) {
        return Err(FixedPointError::overflow(operation));
    }
    Ok(value.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAD: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_mul_div_exact() {
        assert_eq!(mul_div(WAD / 2, 3 * WAD, WAD).unwrap(), 3 * WAD / 2);
        assert_eq!(mul_div_rounding_up(WAD / 2, 3 * WAD, WAD).unwrap(), 3 * WAD / 2);
    }

    #[test]
    fn test_rounding_direction() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_rounding_up(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_rounding_up(0, 5, 3).unwrap(), 0);
    }

    #[test]
    fn test_wide_intermediate() {
        // product exceeds u128 but the quotient does not
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert!(matches!(
            mul_div(u128::MAX, 2, 1),
            Err(FixedPointError::Overflow { .. })
        ));
        assert_eq!(mul_div(1, 1, 0), Err(FixedPointError::DivisionByZero));
    }
}
