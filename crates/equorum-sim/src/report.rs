//! End-of-run state report.

use std::fmt;

use serde::{Deserialize, Serialize};

use equorum_core::{Address, Clock};
use equorum_ledger::SeriesInfo;
use equorum_router::RouterStats;

use crate::scenario::{Simulation, StepOutcome};
use crate::units::format_units;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HolderReport {
    pub address: Address,
    pub label: Option<String>,
    pub tokens: u128,
    pub claimable: u128,
    /// Value the account holds in the bank.
    pub value: u128,
}

/// Invariants checked against the final state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Checks {
    /// routed + returned + balance == received.
    pub router_conserved: bool,
    /// Ledger value covers every outstanding claim.
    pub ledger_solvent: bool,
    /// Token balances sum to the fixed supply.
    pub supply_intact: bool,
    pub ledger_value: u128,
    pub outstanding_claimable: u128,
    /// Ledger value not owed to anyone (rounding dust).
    pub dust: u128,
}

impl Checks {
    pub fn all_pass(&self) -> bool {
        self.router_conserved && self.ledger_solvent && self.supply_intact
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub timestamp: u64,
    pub series: SeriesInfo,
    pub router: RouterStats,
    pub holders: Vec<HolderReport>,
    pub steps: Vec<StepOutcome>,
    pub checks: Checks,
}

impl Report {
    pub fn collect(sim: &Simulation, steps: Vec<StepOutcome>) -> Self {
        let series = &sim.series;
        let labels = sim.labels();

        let mut addresses = series.ledger.holders();
        for address in labels.keys() {
            if !addresses.contains(address) {
                addresses.push(*address);
            }
        }
        let holders = addresses
            .into_iter()
            .map(|address| HolderReport {
                address,
                label: labels.get(&address).cloned(),
                tokens: series.ledger.balance_of(address),
                claimable: series.ledger.calculate_claimable(address),
                value: sim.bank.balance_of(address),
            })
            .collect();

        let ledger_value = series.ledger.value_balance();
        let outstanding_claimable = series.ledger.total_outstanding_claimable();
        Self {
            timestamp: sim.clock.now(),
            series: series.ledger.series_info(),
            router: series.router.stats(),
            holders,
            steps,
            checks: Checks {
                router_conserved: series.router_conserved(),
                ledger_solvent: series.ledger_solvent(),
                supply_intact: series.supply_intact(),
                ledger_value,
                outstanding_claimable,
                dust: ledger_value.saturating_sub(outstanding_claimable),
            },
        }
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.series;
        writeln!(f, "Series:    {} ({})", s.name, s.symbol)?;
        writeln!(f, "Time:      {} (maturity {}, active {})", self.timestamp, s.maturity_timestamp, s.active)?;
        writeln!(f, "Revenue:   {} received, {} claimed", format_units(s.total_revenue_received), format_units(s.total_claimed))?;
        writeln!(f, "Index:     {}", s.accrual_index)?;

        let r = &self.router;
        writeln!(f)?;
        writeln!(f, "Router:    {} received, {} routed, {} returned", format_units(r.total_received), format_units(r.total_routed_to_ledger), format_units(r.total_returned_to_protocol))?;
        writeln!(f, "           {} pending, {} available, {} failed routes{}", format_units(r.pending_to_route), format_units(r.available_balance), r.failed_route_attempts, if r.paused { ", paused" } else { "" })?;

        writeln!(f)?;
        writeln!(f, "{:<12} {:>24} {:>24} {:>24}", "Holder", "Tokens", "Claimable", "Value")?;
        for h in &self.holders {
            let name = h.label.clone().unwrap_or_else(|| h.address.to_string());
            writeln!(f, "{:<12} {:>24} {:>24} {:>24}", name, format_units(h.tokens), format_units(h.claimable), format_units(h.value))?;
        }

        writeln!(f)?;
        for step in &self.steps {
            let mark = if step.ok { "ok  " } else { "FAIL" };
            writeln!(f, "[{mark}] #{:<3} {}", step.index, step.detail)?;
        }

        let c = &self.checks;
        writeln!(f)?;
        writeln!(f, "Conserved: {}", c.router_conserved)?;
        writeln!(f, "Solvent:   {} (dust {})", c.ledger_solvent, c.dust)?;
        write!(f, "Supply:    {}", c.supply_intact)
    }
}
