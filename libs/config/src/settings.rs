//! Engine Configuration Module
//!
//! Loads [`RmmConfig`] from an optional TOML file with environment variable
//! overrides (`RMM__ENGINE__GRACE_PERIOD_SECS=300`), then validates it.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "RMM";

/// Top-level configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct RmmConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Pool engine parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Effective share of swap input after the fee, in basis points
    pub gamma_bps: u32,

    pub grace_period_secs: u64,

    pub min_liquidity: u64,

    /// Invariant regression tolerated per operation, as a decimal fraction
    pub invariant_tolerance: Decimal,
}

/// Logging output settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. `info` or `rmm_engine=debug`
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gamma_bps: defaults::engine::GAMMA_BPS,
            grace_period_secs: defaults::engine::GRACE_PERIOD_SECS,
            min_liquidity: defaults::engine::MIN_LIQUIDITY,
            invariant_tolerance: defaults::engine::INVARIANT_TOLERANCE,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl EngineSettings {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.gamma_bps == 0 || self.gamma_bps > defaults::engine::BPS_DENOMINATOR {
            bail!(
                "engine.gamma_bps must be in (0, {}], got {}",
                defaults::engine::BPS_DENOMINATOR,
                self.gamma_bps
            );
        }
        if self.invariant_tolerance.is_sign_negative() {
            bail!(
                "engine.invariant_tolerance must not be negative, got {}",
                self.invariant_tolerance
            );
        }
        Ok(())
    }
}

impl RmmConfig {
    /// Load from an optional file plus environment variables under `env_prefix`
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading configuration file: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: RmmConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.engine.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }
}

/// Convenience function to load configuration with the standard prefix
pub fn load_config(path: Option<&Path>) -> Result<RmmConfig> {
    RmmConfig::load(path, ENV_PREFIX)
}
