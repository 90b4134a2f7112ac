//! Engine defaults
//!
//! Values used when neither the config file nor the environment overrides
//! them.

/// Pool engine defaults
pub mod engine {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Effective share of swap input after the fee, in basis points (99.85%)
    pub const GAMMA_BPS: u32 = 9_985;

    /// Seconds after maturity during which swaps are still accepted
    pub const GRACE_PERIOD_SECS: u64 = 120;

    /// LP units locked forever on pool creation
    pub const MIN_LIQUIDITY: u64 = 1_000;

    /// Largest tolerated invariant regression per operation
    pub const INVARIANT_TOLERANCE: Decimal = dec!(0.000000001);

    /// Basis point denominator for `GAMMA_BPS`
    pub const BPS_DENOMINATOR: u32 = 10_000;
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}
