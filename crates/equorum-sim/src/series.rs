//! Series deployment: one ledger paired with one router.

use std::sync::Arc;

use tracing::info;

use equorum_core::constants::ROUTE_CALL_BUDGET;
use equorum_core::params::{SeriesBounds, SeriesParams};
use equorum_core::{Address, Bank, Clock};
use equorum_ledger::RevenueLedger;
use equorum_router::{RevenueRouter, RouterParams};

use crate::error::SimError;

/// Deployment options that are not part of the series parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployOptions {
    /// Router owner. Defaults to the protocol.
    pub owner: Option<Address>,
    pub call_budget: u64,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self { owner: None, call_budget: ROUTE_CALL_BUDGET }
    }
}

/// A deployed ledger + router pair.
#[derive(Clone, Debug)]
pub struct Series {
    pub params: SeriesParams,
    pub ledger: Arc<RevenueLedger>,
    pub router: Arc<RevenueRouter>,
}

impl Series {
    /// Router conservation: routed + returned + balance == received.
    pub fn router_conserved(&self) -> bool {
        self.router.is_conserved()
    }

    /// Ledger solvency: held value covers every outstanding claim.
    pub fn ledger_solvent(&self) -> bool {
        self.ledger.value_balance() >= self.ledger.total_outstanding_claimable()
    }

    /// Sum of token balances equals the fixed supply.
    pub fn supply_intact(&self) -> bool {
        self.ledger.total_balances() == self.ledger.total_supply()
    }
}

/// Address the ledger of a series is deployed at.
pub fn ledger_address(params: &SeriesParams) -> Address {
    Address::from_label(&format!("ledger:{}:{}", params.symbol, params.protocol))
}

/// Validate `params`, create the router and the ledger, and bind them.
pub fn deploy_series(
    params: &SeriesParams,
    bounds: &SeriesBounds,
    options: DeployOptions,
    bank: Arc<Bank>,
    clock: Arc<dyn Clock>,
) -> Result<Series, SimError> {
    params.validate(bounds)?;

    let router = RevenueRouter::new(
        RouterParams {
            address: params.router,
            protocol: params.protocol,
            owner: options.owner.unwrap_or(params.protocol),
            share_bps: params.share_bps,
            call_budget: options.call_budget,
        },
        bank.clone(),
    )?;
    let ledger = RevenueLedger::new(ledger_address(params), params, bank, clock)?;
    router.bind_ledger(params.protocol, ledger.clone())?;

    info!(
        symbol = %params.symbol,
        ledger = %ledger.address(),
        router = %router.address(),
        share_bps = params.share_bps,
        "series deployed"
    );
    Ok(Series { params: params.clone(), ledger, router })
}
