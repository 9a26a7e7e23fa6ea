//! Simulation configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then environment variables prefixed `EQUORUM_` with `__` between
//! nested keys (`EQUORUM_SERIES__SHARE_BPS=1500`).
//!
//! Amounts are whole tokens or base units that fit in `u64`; they are widened
//! to `u128` base units when the series parameters are built.

use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use equorum_core::constants::{
    DEFAULT_MAX_MATURITY_SECS, DEFAULT_MAX_SHARE_BPS, DEFAULT_MIN_DISTRIBUTION_FLOOR,
    DEFAULT_MIN_MATURITY_SECS, DEFAULT_MIN_SHARE_BPS, ROUTE_CALL_BUDGET, SECONDS_PER_DAY, UNIT,
};
use equorum_core::params::{SeriesBounds, SeriesParams};
use equorum_core::Address;

use crate::error::SimError;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "EQUORUM";

/// Series definition, in configuration units.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SeriesConfig {
    pub name: String,
    pub symbol: String,
    /// Label (or `0x` address) of the protocol treasury.
    pub protocol: String,
    /// Label of the router owner; the protocol when unset.
    pub owner: Option<String>,
    pub share_bps: u16,
    pub maturity_days: u64,
    /// Claim-token supply in whole tokens.
    pub total_supply_tokens: u64,
    /// Smallest accepted distribution in base units.
    pub minimum_distribution: u64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            name: "Equorum Revenue Series".to_string(),
            symbol: "EQRS".to_string(),
            protocol: "protocol".to_string(),
            owner: None,
            share_bps: 2_000,
            maturity_days: 365,
            total_supply_tokens: 1_000_000,
            minimum_distribution: 1_000_000_000_000_000,
        }
    }
}

/// Deployment bounds, in configuration units.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BoundsConfig {
    pub min_share_bps: u16,
    pub max_share_bps: u16,
    pub min_maturity_days: u64,
    pub max_maturity_days: u64,
    pub min_supply_tokens: u64,
    pub max_supply_tokens: u64,
    pub min_distribution_floor: u64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            min_share_bps: DEFAULT_MIN_SHARE_BPS,
            max_share_bps: DEFAULT_MAX_SHARE_BPS,
            min_maturity_days: DEFAULT_MIN_MATURITY_SECS / SECONDS_PER_DAY,
            max_maturity_days: DEFAULT_MAX_MATURITY_SECS / SECONDS_PER_DAY,
            min_supply_tokens: 1_000,
            max_supply_tokens: 1_000_000_000_000,
            min_distribution_floor: DEFAULT_MIN_DISTRIBUTION_FLOOR as u64,
        }
    }
}

impl BoundsConfig {
    pub fn to_bounds(&self) -> Result<SeriesBounds, SimError> {
        Ok(SeriesBounds {
            min_share_bps: self.min_share_bps,
            max_share_bps: self.max_share_bps,
            min_maturity_secs: days_to_secs(self.min_maturity_days)?,
            max_maturity_secs: days_to_secs(self.max_maturity_days)?,
            min_total_supply: u128::from(self.min_supply_tokens) * UNIT,
            max_total_supply: u128::from(self.max_supply_tokens) * UNIT,
            min_distribution_floor: u128::from(self.min_distribution_floor),
        })
    }
}

/// Top-level simulation settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    pub series: SeriesConfig,
    pub bounds: BoundsConfig,
    /// Unix timestamp the simulated clock starts at.
    pub start_timestamp: u64,
    /// Work budget for each router-to-ledger call.
    pub call_budget: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            series: SeriesConfig::default(),
            bounds: BoundsConfig::default(),
            start_timestamp: 1_700_000_000,
            call_budget: ROUTE_CALL_BUDGET,
        }
    }
}

impl SimConfig {
    /// Load defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SimError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading overrides from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SimError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);
        let config: Self = builder.add_source(environment).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the series parameters and check them against the bounds.
    pub fn validate(&self) -> Result<(), SimError> {
        self.series_params()?.validate(&self.bounds.to_bounds()?)?;
        Ok(())
    }

    pub fn protocol_address(&self) -> Result<Address, SimError> {
        resolve_label(&self.series.protocol)
    }

    pub fn owner_address(&self) -> Result<Address, SimError> {
        match &self.series.owner {
            Some(owner) => resolve_label(owner),
            None => self.protocol_address(),
        }
    }

    /// Series parameters in base units. The router address is derived from
    /// the symbol.
    pub fn series_params(&self) -> Result<SeriesParams, SimError> {
        let s = &self.series;
        Ok(SeriesParams {
            name: s.name.clone(),
            symbol: s.symbol.clone(),
            protocol: self.protocol_address()?,
            router: Address::from_label(&format!("router:{}", s.symbol)),
            share_bps: s.share_bps,
            maturity_duration_secs: days_to_secs(s.maturity_days)?,
            total_supply: u128::from(s.total_supply_tokens) * UNIT,
            minimum_distribution: u128::from(s.minimum_distribution),
        })
    }
}

/// A `0x` hex address is used as is; anything else is a label.
pub fn resolve_label(label: &str) -> Result<Address, SimError> {
    if label.starts_with("0x") {
        Ok(label.parse()?)
    } else {
        Ok(Address::from_label(label))
    }
}

fn days_to_secs(days: u64) -> Result<u64, SimError> {
    days.checked_mul(SECONDS_PER_DAY).ok_or(SimError::Overflow("maturity in seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = SimConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(cfg, SimConfig::default());
        let params = cfg.series_params().unwrap();
        assert_eq!(params.total_supply, 1_000_000 * UNIT);
        assert_eq!(params.protocol, Address::from_label("protocol"));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
start_timestamp = 42

[series]
name = "Custom"
symbol = "CST"
protocol = "treasury"
share_bps = 1500
maturity_days = 90
total_supply_tokens = 5000
minimum_distribution = 1
"#
        )
        .unwrap();

        let cfg = SimConfig::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(cfg.start_timestamp, 42);
        assert_eq!(cfg.series.symbol, "CST");
        assert_eq!(cfg.series.share_bps, 1_500);
        assert_eq!(cfg.protocol_address().unwrap(), Address::from_label("treasury"));
        // Untouched sections keep their defaults.
        assert_eq!(cfg.bounds, BoundsConfig::default());
        assert_eq!(cfg.call_budget, ROUTE_CALL_BUDGET);
    }

    #[test]
    fn environment_overrides_file() {
        let cfg = SimConfig::load_with_env(
            None,
            env(&[("EQUORUM_SERIES__SHARE_BPS", "3000"), ("EQUORUM_CALL_BUDGET", "500")]),
        )
        .unwrap();
        assert_eq!(cfg.series.share_bps, 3_000);
        assert_eq!(cfg.call_budget, 500);
    }

    #[test]
    fn out_of_bounds_share_rejected() {
        let err = SimConfig::load_with_env(None, env(&[("EQUORUM_SERIES__SHARE_BPS", "6000")])).unwrap_err();
        assert!(matches!(err, SimError::Params(_)), "{err}");
    }

    #[test]
    fn missing_file_rejected() {
        let err = SimConfig::load_with_env(Some(Path::new("/nonexistent/equorum.toml")), env(&[])).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn owner_defaults_to_protocol() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.owner_address().unwrap(), cfg.protocol_address().unwrap());
        let cfg = SimConfig {
            series: SeriesConfig { owner: Some("ops".into()), ..SeriesConfig::default() },
            ..SimConfig::default()
        };
        assert_eq!(cfg.owner_address().unwrap(), Address::from_label("ops"));
    }

    #[test]
    fn hex_labels_parse_as_addresses() {
        let a = Address::from_label("x");
        assert_eq!(resolve_label(&a.to_string()).unwrap(), a);
        assert!(resolve_label("0xzz").is_err());
    }
}
