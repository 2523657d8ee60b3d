//! Engine configuration and shared constants
//!
//! `constants` is the single source of truth for magic values used across
//! the engine. `EngineConfig` holds the handful of knobs a host UI may tune.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Shared constants
pub mod constants {
    /// Sentinel value for an unset, broken or poisoned computation
    pub const NA: &str = "NA";

    /// Handle names exposed by blocks
    pub mod handles {
        /// Input handle on Primitive, Operator and Result blocks
        pub const INPUT: &str = "in";
        /// Output handle on Primitive and Operator blocks
        pub const OUTPUT: &str = "out";
    }

    /// Default values for engine configuration
    pub mod defaults {
        /// Digits kept after the decimal point for non-integral results
        pub const DECIMAL_PRECISION: usize = 10;
        /// Upper bound on precision; f64 carries at most 17 significant digits
        pub const MAX_DECIMAL_PRECISION: usize = 17;
    }

    /// Visual marker attached to accepted connections
    pub mod marker {
        pub const ID: &str = "arrow";
        pub const COLOR: &str = "#2f2f2f";
        pub const SIZE: f32 = 30.0;
    }
}

/// Tunable engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Fixed precision for non-integral results, before trailing zeros are trimmed
    pub decimal_precision: usize,
    /// Reset a Result block to empty when it loses its chain
    pub reset_disconnected_results: bool,
    /// Namespace prepended to generated block and connection IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_prefix: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decimal_precision: constants::defaults::DECIMAL_PRECISION,
            reset_disconnected_results: true,
            id_prefix: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the ID namespace
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Check that all settings are within range
    pub fn validate(&self) -> Result<()> {
        if self.decimal_precision > constants::defaults::MAX_DECIMAL_PRECISION {
            return Err(EngineError::invalid_config(format!(
                "decimalPrecision must be at most {}, got {}",
                constants::defaults::MAX_DECIMAL_PRECISION,
                self.decimal_precision
            )));
        }
        Ok(())
    }
}
