//! Signed 64.64 fixed-point arithmetic for replication math
//!
//! `FixedPoint64x64` stores a value as an `i128` whose low 64 bits are the
//! fractional part. Every operation is checked and returns a
//! [`FixedPointError`] instead of wrapping or panicking, so that invariant
//! checks built on top of it are reproducible bit-for-bit.
//!
//! ## Rounding
//!
//! - Multiplication and division use 256-bit intermediates and truncate
//!   toward zero.
//! - `mul_u128` (scaling a token amount by a fraction) truncates toward zero.
//! - `log2`, `ln`, `exp2`, `exp` and `sqrt` truncate their final result.
//!
//! ## Domains
//!
//! - `log2`/`ln` require a strictly positive input.
//! - `sqrt` requires a non-negative input.
//! - `exp2`/`exp` reject inputs of 64 or more; inputs below -64 return zero.

use crate::common::errors::FixedPointError;
use ethnum::{I256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FRACTIONAL_BITS: u32 = 64;
const ONE_RAW: i128 = 1 << FRACTIONAL_BITS;
const FRACTION_MASK: i128 = ONE_RAW - 1;

/// `exp2` is defined for inputs strictly below 64
const EXP2_DOMAIN_RAW: i128 = 64 << FRACTIONAL_BITS;

/// ln(2) scaled by 2^127
const LN2_X127: i128 = 0x58b90bfbe8e7bcd5e4f1d9cc01f97b58;

/// log2(e) scaled by 2^126
const LOG2_E_X126: i128 = 0x5c551d94ae0bf85ddf43ff68348e9f44;

const TWO_POW_62: I256 = I256::new(1 << 62);
const TWO_POW_63: I256 = I256::new(1 << 63);
const TWO_POW_64: I256 = I256::new(ONE_RAW);

/// 2^(2^-(i+1)) scaled by 2^127, for i in 0..64
const EXP2_FACTORS_X127: [u128; 64] = [
    0xb504f333f9de6484597d89b3754abe9f,
    0x9837f0518db8a96f46ad23182e42f6f6,
    0x8b95c1e3ea8bd6e6fbe4628758a53c90,
    0x85aac367cc487b14c5c95b8c2154c1b2,
    0x82cd8698ac2ba1d73e2a475b46520bff,
    0x8164d1f3bc0307737be56527bd14def5,
    0x80b1ed4fd999ab6c25335719b6e6fd20,
    0x8058d7d2d5e5f6b094d589f608ee4aa2,
    0x802c6436d0e04f50ff8ce94a6797b3ce,
    0x8016302f174676283690dfe44d11d008,
    0x800b179c82028fd0945e54e2ae18f2f0,
    0x80058baf7fee3b5d1c718b38e549cb93,
    0x8002c5d00fdcfcb6b6566a58c048be1f,
    0x800162e61bed4a48e84c2e1a463473da,
    0x8000b17292f702a3aa22beacca949013,
    0x800058b92abbae02030c5fa5256f41fe,
    0x80002c5c8dade4d71776c0f4dbea67d6,
    0x8000162e44eaf636526be456600bdbe5,
    0x80000b1721fa7c188307016c1cd4e8b7,
    0x8000058b90de7e4cecfc487503488bb2,
    0x800002c5c8678f36cbfce50a6de60b14,
    0x80000162e431db9f80b2347b5d62e516,
    0x800000b1721872d0c7b08cf1e0114153,
    0x80000058b90c1aa8a5c3736cb77e8e00,
    0x8000002c5c8605a4635f2efc2362d978,
    0x800000162e4300e635cf4a109e3939bd,
    0x8000000b17217ff81bef9c551590cf83,
    0x800000058b90bfdd4e39cd52c0cfa27d,
    0x80000002c5c85fe6f72d669e0e76e412,
    0x8000000162e42ff18f9ad35186d0df28,
    0x80000000b17217f84cce71aa0dcfffe8,
    0x8000000058b90bfc07a77ad56ed22aaa,
    0x800000002c5c85fdfc23cdead40da8d7,
    0x80000000162e42fefc25eb1571853a66,
    0x800000000b17217f7d97f692baacded5,
    0x80000000058b90bfbead3b8b5dd254d8,
    0x8000000002c5c85fdf4eedd62f084e68,
    0x800000000162e42fefa58aef378bf587,
    0x8000000000b17217f7d24a78a3c7ef03,
    0x800000000058b90bfbe9067c93e474a6,
    0x80000000002c5c85fdf47b8e5a72599f,
    0x8000000000162e42fefa3bdb315934a3,
    0x80000000000b17217f7d1d7299b49c46,
    0x8000000000058b90bfbe8e9a8d1c4ea0,
    0x800000000002c5c85fdf4745969ea76f,
    0x80000000000162e42fefa3a0df5373c0,
    0x800000000000b17217f7d1cff4aac1e2,
    0x80000000000058b90bfbe8e7db95a2f1,
    0x8000000000002c5c85fdf473e61ae1f9,
    0x800000000000162e42fefa39f121751c,
    0x8000000000000b17217f7d1cf815bb96,
    0x800000000000058b90bfbe8e7bec1e0d,
    0x80000000000002c5c85fdf473dee5f17,
    0x8000000000000162e42fefa39ef54390,
    0x80000000000000b17217f7d1cf7a26c9,
    0x8000000000000058b90bfbe8e7bcf4a5,
    0x800000000000002c5c85fdf473de72a2,
    0x80000000000000162e42fefa39ef3765,
    0x800000000000000b17217f7d1cf79b38,
    0x80000000000000058b90bfbe8e7bcd7d,
    0x8000000000000002c5c85fdf473de6b7,
    0x800000000000000162e42fefa39ef359,
    0x8000000000000000b17217f7d1cf79ac,
    0x800000000000000058b90bfbe8e7bcd6,
];

/// Signed fixed-point number with 64 integer bits and 64 fractional bits
///
/// Examples:
/// - 1.0 = FixedPoint64x64(1 << 64)
/// - 0.5 = FixedPoint64x64(1 << 63)
/// - -2.0 = FixedPoint64x64(-(2 << 64))
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FixedPoint64x64(i128);

impl FixedPoint64x64 {
    /// Number of fractional bits
    pub const FRACTIONAL_BITS: u32 = FRACTIONAL_BITS;

    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);
    pub const HALF: Self = Self(ONE_RAW >> 1);
    pub const TWO: Self = Self(ONE_RAW << 1);
    pub const MAX: Self = Self(i128::MAX);
    pub const MIN: Self = Self(i128::MIN);

    /// Create from raw 64.64 bits
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Get the raw 64.64 bits
    #[inline]
    pub const fn raw_value(self) -> i128 {
        self.0
    }

    /// Every `i64` is representable, so this cannot fail
    #[inline]
    pub const fn from_int(value: i64) -> Self {
        Self((value as i128) << FRACTIONAL_BITS)
    }

    pub fn from_u64(value: u64) -> Result<Self, FixedPointError> {
        i64::try_from(value)
            .map(Self::from_int)
            .map_err(|_| FixedPointError::overflow("from_u64"))
    }

    /// `numerator / denominator` as a 64.64 value, truncated
    ///
    /// This is the bridge from integer token amounts into curve space, e.g.
    /// `from_ratio(reserve_risky, liquidity)` is the risky reserve per LP unit.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self, FixedPointError> {
        if denominator == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        let quotient = (U256::new(numerator) << FRACTIONAL_BITS) / U256::new(denominator);
        narrow_unsigned(quotient, "from_ratio")
    }

    /// Create from a decimal string with exact parsing
    ///
    /// This is the PRIMARY method for creating values from configuration files
    /// and other external input.
    ///
    /// # Examples
    /// ```
    /// use rmm_types::FixedPoint64x64;
    ///
    /// let half = FixedPoint64x64::from_decimal_str("0.5").unwrap();
    /// assert_eq!(half, FixedPoint64x64::HALF);
    /// ```
    pub fn from_decimal_str(s: &str) -> Result<Self, FixedPointError> {
        let decimal = Decimal::from_str(s).map_err(|_| FixedPointError::InvalidDecimal {
            input: s.to_string(),
        })?;
        Self::from_decimal(decimal)
    }

    /// Convert a `Decimal` to 64.64, truncating toward zero
    pub fn from_decimal(value: Decimal) -> Result<Self, FixedPointError> {
        let numerator = I256::new(value.mantissa()) * TWO_POW_64;
        let denominator = I256::new(10i128.pow(value.scale()));
        narrow_signed(numerator / denominator, "from_decimal")
    }

    /// Convert to `Decimal` with 18 fractional digits (truncated)
    pub fn to_decimal(self) -> Decimal {
        let integer = self.0 / ONE_RAW;
        let remainder = self.0 % ONE_RAW;
        let fraction = remainder * 1_000_000_000_000_000_000 / ONE_RAW;
        Decimal::from(integer as i64) + Decimal::new(fraction as i64, 18)
    }

    /// Convert to f64 for display or logging
    ///
    /// # Warning
    /// Never feed the result back into invariant checks.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / ONE_RAW as f64
    }

    /// Integer part, truncated toward zero
    #[inline]
    pub const fn to_int(self) -> i64 {
        (self.0 / ONE_RAW) as i64
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, FixedPointError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::overflow("add"))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, FixedPointError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::overflow("sub"))
    }

    pub fn checked_mul(self, rhs: Self) -> Result<Self, FixedPointError> {
        let product = I256::new(self.0) * I256::new(rhs.0);
        narrow_signed(product / TWO_POW_64, "mul")
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self, FixedPointError> {
        if rhs.0 == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        let numerator = I256::new(self.0) * TWO_POW_64;
        narrow_signed(numerator / I256::new(rhs.0), "div")
    }

    pub fn checked_neg(self) -> Result<Self, FixedPointError> {
        self.0
            .checked_neg()
            .map(Self)
            .ok_or(FixedPointError::overflow("neg"))
    }

    pub fn checked_abs(self) -> Result<Self, FixedPointError> {
        self.0
            .checked_abs()
            .map(Self)
            .ok_or(FixedPointError::overflow("abs"))
    }

    /// Scale an integer amount by this non-negative fraction, truncating
    ///
    /// `per_unit.mul_u128(liquidity)` turns a per-LP-unit reserve back into
    /// token base units.
    pub fn mul_u128(self, value: u128) -> Result<u128, FixedPointError> {
        if self.0 < 0 {
            return Err(FixedPointError::domain("mul_u128", "negative multiplier"));
        }
        let product = (U256::new(self.0 as u128) * U256::new(value)) >> FRACTIONAL_BITS;
        if product > U256::new(u128::MAX) {
            return Err(FixedPointError::overflow("mul_u128"));
        }
        Ok(product.as_u128())
    }

    pub fn sqrt(self) -> Result<Self, FixedPointError> {
        if self.0 < 0 {
            return Err(FixedPointError::domain("sqrt", "negative input"));
        }
        // sqrt(raw * 2^64) < 2^96, always representable
        let root = isqrt(U256::new(self.0 as u128) << FRACTIONAL_BITS);
        Ok(Self(root.as_u128() as i128))
    }

    /// Binary logarithm by repeated squaring of the normalized mantissa
    pub fn log2(self) -> Result<Self, FixedPointError> {
        if self.0 <= 0 {
            return Err(FixedPointError::domain("log2", "non-positive input"));
        }
        let msb = 127 - (self.0 as u128).leading_zeros();
        let mut result = (msb as i128 - 64) << FRACTIONAL_BITS;

        // mantissa in [2^127, 2^128)
        let mut mantissa = U256::new(self.0 as u128) << (127 - msb);
        let mut bit: i128 = 1 << 63;
        while bit > 0 {
            mantissa = mantissa * mantissa;
            let carry = (mantissa >> 255u32).as_u32();
            mantissa = mantissa >> (127 + carry);
            if carry == 1 {
                result += bit;
            }
            bit >>= 1;
        }
        Ok(Self(result))
    }

    /// Natural logarithm, `log2(x) * ln(2)`
    pub fn ln(self) -> Result<Self, FixedPointError> {
        if self.0 <= 0 {
            return Err(FixedPointError::domain("ln", "non-positive input"));
        }
        let log2 = self.log2()?;
        let product = I256::new(log2.0) * I256::new(LN2_X127);
        narrow_signed(product / TWO_POW_64 / TWO_POW_63, "ln")
    }

    /// Binary exponent, `2^x`
    pub fn exp2(self) -> Result<Self, FixedPointError> {
        if self.0 >= EXP2_DOMAIN_RAW {
            return Err(FixedPointError::domain("exp2", "exponent of 64 or more"));
        }
        if self.0 < -EXP2_DOMAIN_RAW {
            return Ok(Self::ZERO);
        }

        let integer = self.0 >> FRACTIONAL_BITS;
        let fraction = (self.0 & FRACTION_MASK) as u128;

        // 2^fraction scaled by 2^127, in [2^127, 2^128)
        let mut result = U256::new(1u128 << 127);
        for (i, factor) in EXP2_FACTORS_X127.iter().enumerate() {
            if fraction & (1u128 << (63 - i)) != 0 {
                result = (result * U256::new(*factor)) >> 127u32;
            }
        }

        let shift = (63 - integer) as u32;
        narrow_unsigned(result >> shift, "exp2")
    }

    /// Natural exponent, `2^(x * log2(e))`
    pub fn exp(self) -> Result<Self, FixedPointError> {
        if self.0 >= EXP2_DOMAIN_RAW {
            return Err(FixedPointError::domain("exp", "exponent of 64 or more"));
        }
        if self.0 < -EXP2_DOMAIN_RAW {
            return Ok(Self::ZERO);
        }
        let scaled = I256::new(self.0) * I256::new(LOG2_E_X126) / TWO_POW_64 / TWO_POW_62;
        narrow_signed(scaled, "exp")?
            .exp2()
            .map_err(|_| FixedPointError::overflow("exp"))
    }
}

/// Largest integer `r` with `r * r <= n`
fn isqrt(n: U256) -> U256 {
    if n == U256::ZERO {
        return U256::ZERO;
    }
    let bits = 256 - n.leading_zeros();
    let mut x = U256::ONE << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) >> 1u32;
        if y >= x {
            return x;
        }
        x = y;
    }
}

fn narrow_signed(value: I256, operation: &'static str) -> Result<FixedPoint64x64, FixedPointError> {
    if value > I256::new(i128::MAX) || value < I256::new(i128::MIN) {
        return Err(FixedPointError::overflow(operation));
    }
    Ok(FixedPoint64x64(value.as_i128()))
}

fn narrow_unsigned(
    value: U256,
    operation: &'static str,
) -> Result<FixedPoint64x64, FixedPointError> {
    if value > U256::new(i128::MAX as u128) {
        return Err(FixedPointError::overflow(operation));
    }
    Ok(FixedPoint64x64(value.as_u128() as i128))
}

/// Display implementation for convenient logging
impl fmt::Display for FixedPoint64x64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal().normalize())
    }
}
