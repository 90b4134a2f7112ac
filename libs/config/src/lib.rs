//! # RMM Configuration
//!
//! Layered configuration for the pool engine and the binaries that host it.
//!
//! ## Features
//!
//! - **Engine Defaults**: fee, grace period, minimum liquidity, invariant tolerance
//! - **File + Environment**: optional TOML file, `RMM__`-prefixed overrides
//! - **Validation**: settings the engine cannot run with are rejected at load
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rmm_config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("config/rmm.toml"))).unwrap();
//! println!("fee multiplier: {} bps", config.engine.gamma_bps);
//! ```

pub mod defaults;
pub mod settings;

// Re-export commonly used types
pub use settings::{load_config, EngineSettings, LoggingSettings, RmmConfig, ENV_PREFIX};
