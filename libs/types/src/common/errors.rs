//! Error types for fixed-point arithmetic and identifier validation
//!
//! Every fallible fixed-point operation reports exactly why it failed so that
//! callers several layers up (curve math, pool engine) can surface a precise
//! reason instead of a generic arithmetic failure.

use thiserror::Error;

/// Errors that can occur while parsing or validating typed identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Input is not valid hexadecimal
    #[error("Invalid hex string: '{input}'")]
    InvalidHex { input: String },

    /// Decoded byte length does not match the identifier width
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// True mathematical result is not representable in 64.64
    #[error("Overflow in fixed-point {operation}")]
    Overflow { operation: &'static str },

    /// Input lies outside the domain of the operation
    #[error("Domain error in fixed-point {operation}: {reason}")]
    Domain {
        operation: &'static str,
        reason: &'static str,
    },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },
}

impl FixedPointError {
    pub const fn overflow(operation: &'static str) -> Self {
        Self::Overflow { operation }
    }

    pub const fn domain(operation: &'static str, reason: &'static str) -> Self {
        Self::Domain { operation, reason }
    }
}
