//! Hub configuration, loaded from TOML.
//!
//! ```toml
//! [logging]
//! filter = "fundline=debug"
//!
//! [guard]
//! max_price_change_bps = 500
//! max_valuation_age_secs = 900
//! enforce_limits = true
//!
//! [epoch]
//! require_fresh_valuations = true
//! close_gain_loss = false
//! revalue_holdings = true
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use fundline_price_guard::{GuardConfig, GuardError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid guard config: {0}")]
    Guard(#[from] GuardError),

    #[error("logging filter must not be empty")]
    EmptyLogFilter,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Steps `run_epoch` performs besides pricing and settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochConfig {
    /// Refuse to run when any valued holding of the share class is stale.
    pub require_fresh_valuations: bool,
    /// Fold unrealized gain/loss into equity after settlement.
    pub close_gain_loss: bool,
    /// Revalue every holding of the share class before pricing.
    pub revalue_holdings: bool,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            require_fresh_valuations: true,
            close_gain_loss: false,
            revalue_holdings: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub logging: LoggingConfig,
    /// Limits for pools without an explicit guard configuration.
    pub guard: GuardConfig,
    pub epoch: EpochConfig,
}

impl HubConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: HubConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        self.guard.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = HubConfig::from_toml_str("").unwrap();
        assert_eq!(config, HubConfig::default());
        assert_eq!(config.guard.max_price_change_bps, 1_000);
        assert_eq!(config.guard.max_valuation_age_secs, 3_600);
        assert!(config.guard.enforce_limits);
        assert!(config.epoch.require_fresh_valuations);
        assert!(!config.epoch.close_gain_loss);
        assert!(config.epoch.revalue_holdings);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = HubConfig::from_toml_str(
            r#"
            [guard]
            max_price_change_bps = 250

            [epoch]
            close_gain_loss = true
            "#,
        )
        .unwrap();
        assert_eq!(config.guard.max_price_change_bps, 250);
        assert_eq!(config.guard.max_valuation_age_secs, 3_600);
        assert!(config.epoch.close_gain_loss);
        assert!(config.epoch.revalue_holdings);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = HubConfig::from_toml_str("[guard]\nmax_price_change_bps = 20000\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Guard(GuardError::InvalidMaxChange { bps: 20_000, .. })
        ));

        let err = HubConfig::from_toml_str("[guard]\nmax_valuation_age_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Guard(GuardError::ZeroValuationAge)));

        let err =
            HubConfig::from_toml_str("[guard]\nmax_valuation_age_secs = 9223372036854775807\n")
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Guard(GuardError::ValuationAgeTooLarge { .. })
        ));

        let err = HubConfig::from_toml_str("[logging]\nfilter = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLogFilter));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = HubConfig::from_toml_str("[guard\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HubConfig::load("/nonexistent/fundline.toml").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("fundline.toml")),
            other => panic!("unexpected error {other}"),
        }
    }
}
