//! # RMM Types Library
//!
//! Value types shared by every crate in the workspace.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: curve math runs on `FixedPoint64x64`, never on `f64`
//! - **Checked Everywhere**: every arithmetic operation returns a typed error
//! - **Type Safety**: `Address` and `PoolId` cannot be mixed up
//! - **Clear Boundaries**: `from_decimal_str`/`to_f64` are the only float and
//!   string entry points
//!
//! ## Quick Start
//!
//! ```rust
//! use rmm_types::{mul_div, FixedPoint64x64};
//!
//! let half = FixedPoint64x64::from_decimal_str("0.5").unwrap();
//! let amount = half.mul_u128(2_000).unwrap();
//! assert_eq!(amount, 1_000);
//!
//! assert_eq!(mul_div(3, 5, 2).unwrap(), 7);
//! ```

pub mod common;

pub use common::errors::{FixedPointError, ValidationError};
pub use common::fixed_point::FixedPoint64x64;
pub use common::full_math::{mul_div, mul_div_rounding_up};
pub use common::identifiers::{Address, PoolId};
