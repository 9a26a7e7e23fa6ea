//! Series construction parameters and their deployment bounds.
//!
//! A series is created from a [`SeriesParams`] that has been checked against
//! a [`SeriesBounds`]. The ledger and router trust validated parameters and
//! never consult the bounds again.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::constants::{
    BPS_PRECISION, DEFAULT_MAX_MATURITY_SECS, DEFAULT_MAX_SHARE_BPS, DEFAULT_MAX_TOTAL_SUPPLY,
    DEFAULT_MIN_DISTRIBUTION_FLOOR, DEFAULT_MIN_MATURITY_SECS, DEFAULT_MIN_SHARE_BPS,
    DEFAULT_MIN_TOTAL_SUPPLY,
};
use crate::error::ParamsError;

/// Everything needed to create a ledger + router pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SeriesParams {
    /// Claim-token name.
    pub name: String,
    /// Claim-token symbol.
    pub symbol: String,
    /// Protocol treasury: receives the full supply and the router remainder.
    pub protocol: Address,
    /// Router paired with the ledger; allowed to distribute.
    pub router: Address,
    /// Ledger share of every routed deposit, in basis points.
    pub share_bps: u16,
    /// Seconds from creation until the series stops accepting deposits.
    pub maturity_duration_secs: u64,
    /// Fixed claim-token supply, in base units.
    pub total_supply: u128,
    /// Smallest accepted distribution, in base units.
    pub minimum_distribution: u128,
}

impl SeriesParams {
    /// Check every field against `bounds`, reporting the first violation.
    pub fn validate(&self, bounds: &SeriesBounds) -> Result<(), ParamsError> {
        bounds.check()?;
        if self.name.trim().is_empty() {
            return Err(ParamsError::EmptyName);
        }
        if self.symbol.trim().is_empty() {
            return Err(ParamsError::EmptySymbol);
        }
        if self.protocol.is_zero() {
            return Err(ParamsError::NullProtocol);
        }
        if self.router.is_zero() {
            return Err(ParamsError::NullRouter);
        }
        if self.protocol == self.router {
            return Err(ParamsError::ProtocolIsRouter(self.router));
        }
        if self.share_bps < bounds.min_share_bps || self.share_bps > bounds.max_share_bps {
            return Err(ParamsError::ShareOutOfBounds {
                bps: self.share_bps,
                min: bounds.min_share_bps,
                max: bounds.max_share_bps,
            });
        }
        if self.maturity_duration_secs < bounds.min_maturity_secs
            || self.maturity_duration_secs > bounds.max_maturity_secs
        {
            return Err(ParamsError::MaturityOutOfBounds {
                secs: self.maturity_duration_secs,
                min: bounds.min_maturity_secs,
                max: bounds.max_maturity_secs,
            });
        }
        if self.total_supply < bounds.min_total_supply || self.total_supply > bounds.max_total_supply {
            return Err(ParamsError::SupplyOutOfBounds {
                supply: self.total_supply,
                min: bounds.min_total_supply,
                max: bounds.max_total_supply,
            });
        }
        if self.minimum_distribution < bounds.min_distribution_floor {
            return Err(ParamsError::MinimumDistributionTooLow {
                got: self.minimum_distribution,
                floor: bounds.min_distribution_floor,
            });
        }
        Ok(())
    }
}

/// Deployment limits for [`SeriesParams`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SeriesBounds {
    pub min_share_bps: u16,
    pub max_share_bps: u16,
    pub min_maturity_secs: u64,
    pub max_maturity_secs: u64,
    pub min_total_supply: u128,
    pub max_total_supply: u128,
    pub min_distribution_floor: u128,
}

impl SeriesBounds {
    fn check(&self) -> Result<(), ParamsError> {
        if self.min_share_bps > self.max_share_bps || self.max_share_bps > BPS_PRECISION {
            return Err(ParamsError::InvalidBounds(format!(
                "share range [{}, {}] not within [0, {BPS_PRECISION}]",
                self.min_share_bps, self.max_share_bps
            )));
        }
        if self.min_maturity_secs > self.max_maturity_secs {
            return Err(ParamsError::InvalidBounds("maturity range is inverted".into()));
        }
        if self.min_total_supply == 0 || self.min_total_supply > self.max_total_supply {
            return Err(ParamsError::InvalidBounds("supply range is empty or includes zero".into()));
        }
        Ok(())
    }
}

impl Default for SeriesBounds {
    fn default() -> Self {
        Self {
            min_share_bps: DEFAULT_MIN_SHARE_BPS,
            max_share_bps: DEFAULT_MAX_SHARE_BPS,
            min_maturity_secs: DEFAULT_MIN_MATURITY_SECS,
            max_maturity_secs: DEFAULT_MAX_MATURITY_SECS,
            min_total_supply: DEFAULT_MIN_TOTAL_SUPPLY,
            max_total_supply: DEFAULT_MAX_TOTAL_SUPPLY,
            min_distribution_floor: DEFAULT_MIN_DISTRIBUTION_FLOOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{SECONDS_PER_DAY, UNIT};

    fn params() -> SeriesParams {
        SeriesParams {
            name: "Equorum Revenue Series 1".into(),
            symbol: "EQR1".into(),
            protocol: Address::from_label("protocol"),
            router: Address::from_label("router"),
            share_bps: 2_000,
            maturity_duration_secs: 365 * SECONDS_PER_DAY,
            total_supply: 1_000_000 * UNIT,
            minimum_distribution: UNIT / 1_000,
        }
    }

    #[test]
    fn valid_params_pass() {
        params().validate(&SeriesBounds::default()).unwrap();
    }

    #[test]
    fn empty_name_rejected() {
        let p = SeriesParams { name: "  ".into(), ..params() };
        assert_eq!(p.validate(&SeriesBounds::default()), Err(ParamsError::EmptyName));
    }

    #[test]
    fn empty_symbol_rejected() {
        let p = SeriesParams { symbol: String::new(), ..params() };
        assert_eq!(p.validate(&SeriesBounds::default()), Err(ParamsError::EmptySymbol));
    }

    #[test]
    fn null_addresses_rejected() {
        let b = SeriesBounds::default();
        let p = SeriesParams { protocol: Address::ZERO, ..params() };
        assert_eq!(p.validate(&b), Err(ParamsError::NullProtocol));
        let p = SeriesParams { router: Address::ZERO, ..params() };
        assert_eq!(p.validate(&b), Err(ParamsError::NullRouter));
    }

    #[test]
    fn protocol_cannot_be_router() {
        let p = SeriesParams { router: Address::from_label("protocol"), ..params() };
        assert_eq!(
            p.validate(&SeriesBounds::default()),
            Err(ParamsError::ProtocolIsRouter(Address::from_label("protocol")))
        );
    }

    #[test]
    fn share_above_max_rejected() {
        let p = SeriesParams { share_bps: 5_001, ..params() };
        assert!(matches!(
            p.validate(&SeriesBounds::default()),
            Err(ParamsError::ShareOutOfBounds { bps: 5_001, .. })
        ));
    }

    #[test]
    fn zero_share_rejected_by_default() {
        let p = SeriesParams { share_bps: 0, ..params() };
        assert!(matches!(
            p.validate(&SeriesBounds::default()),
            Err(ParamsError::ShareOutOfBounds { .. })
        ));
    }

    #[test]
    fn maturity_bounds() {
        let b = SeriesBounds::default();
        let p = SeriesParams { maturity_duration_secs: SECONDS_PER_DAY, ..params() };
        assert!(matches!(p.validate(&b), Err(ParamsError::MaturityOutOfBounds { .. })));
        let p = SeriesParams { maturity_duration_secs: b.max_maturity_secs + 1, ..params() };
        assert!(matches!(p.validate(&b), Err(ParamsError::MaturityOutOfBounds { .. })));
    }

    #[test]
    fn supply_bounds() {
        let p = SeriesParams { total_supply: 999 * UNIT, ..params() };
        assert!(matches!(
            p.validate(&SeriesBounds::default()),
            Err(ParamsError::SupplyOutOfBounds { .. })
        ));
    }

    #[test]
    fn zero_minimum_distribution_rejected() {
        let p = SeriesParams { minimum_distribution: 0, ..params() };
        assert_eq!(
            p.validate(&SeriesBounds::default()),
            Err(ParamsError::MinimumDistributionTooLow { got: 0, floor: 1 })
        );
    }

    #[test]
    fn inverted_bounds_rejected() {
        let b = SeriesBounds { min_share_bps: 10, max_share_bps: 5, ..SeriesBounds::default() };
        assert!(matches!(params().validate(&b), Err(ParamsError::InvalidBounds(_))));
        let b = SeriesBounds { max_share_bps: 10_001, ..SeriesBounds::default() };
        assert!(matches!(params().validate(&b), Err(ParamsError::InvalidBounds(_))));
    }

    #[test]
    fn params_serde_roundtrip() {
        let p = params();
        let json = serde_json::to_string(&p).unwrap();
        let back: SeriesParams = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
