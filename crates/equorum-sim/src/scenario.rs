//! Scripted scenarios.
//!
//! A [`Scenario`] is a JSON list of [`Step`]s. Actors are named by label
//! (`"alice"`) or `0x` address; the labels `protocol`, `router` and `ledger`
//! refer to the deployed series. A failing step is recorded and the run
//! continues, so a scenario can assert on rejections as well as successes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use equorum_core::constants::SECONDS_PER_DAY;
use equorum_core::{Address, Bank, ManualClock, ValueReceiver};
use equorum_router::RouteOutcome;

use crate::config::{SimConfig, resolve_label};
use crate::error::SimError;
use crate::report::Report;
use crate::series::{DeployOptions, Series, deploy_series};
use crate::units::{format_units, parse_units};

/// One scripted action. Amounts are decimal strings in whole units.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Mint value to an account.
    Fund { account: String, amount: String },
    /// Deposit into the router as call value.
    Deposit { payer: String, amount: String },
    /// Plain value transfer; the recipient's hook decides.
    Send { from: String, to: String, amount: String },
    Route,
    ReceiveAndRoute { payer: String, amount: String },
    /// Distribute straight into the ledger, bypassing the router.
    Distribute { caller: String, amount: String },
    /// Claim-token transfer.
    Transfer { from: String, to: String, amount: String },
    Approve { owner: String, spender: String, amount: String },
    TransferFrom { spender: String, from: String, to: String, amount: String },
    Claim { holder: String },
    ClaimFor { caller: String, user: String },
    Advance {
        #[serde(default)]
        days: u64,
        #[serde(default)]
        seconds: u64,
    },
    Mature { caller: String },
    Withdraw { caller: String, amount: String },
    WithdrawAll { caller: String },
    EmergencyWithdraw { caller: String, to: String },
    Pause { caller: String },
    Unpause { caller: String },
    /// Make an account refuse incoming value.
    Refuse { account: String },
    /// Make a refusing account accept value again.
    Accept { account: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SimError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// What happened when a step ran.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub step: Step,
    pub ok: bool,
    /// Result summary on success, error message on failure.
    pub detail: String,
}

/// Receive hook that refuses everything.
struct RefusingAccount;

impl ValueReceiver for RefusingAccount {
    fn receive(&self, _from: Address, _amount: u128) -> Result<(), String> {
        Err("account refuses incoming value".to_string())
    }
}

/// A deployed series plus the simulated bank and clock it runs against.
pub struct Simulation {
    pub bank: Arc<Bank>,
    pub clock: Arc<ManualClock>,
    pub series: Series,
    labels: BTreeMap<Address, String>,
    refusing: HashMap<Address, Arc<RefusingAccount>>,
}

impl Simulation {
    /// Deploy the series described by `config` on a fresh bank.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let bank = Bank::shared();
        let clock = Arc::new(ManualClock::new(config.start_timestamp));
        let params = config.series_params()?;
        let options = DeployOptions {
            owner: Some(config.owner_address()?),
            call_budget: config.call_budget,
        };
        let series = deploy_series(
            &params,
            &config.bounds.to_bounds()?,
            options,
            bank.clone(),
            clock.clone(),
        )?;

        let mut labels = BTreeMap::new();
        labels.insert(params.protocol, "protocol".to_string());
        labels.insert(series.router.address(), "router".to_string());
        labels.insert(series.ledger.address(), "ledger".to_string());
        Ok(Self { bank, clock, series, labels, refusing: HashMap::new() })
    }

    /// Resolve an actor name, remembering labels for the report.
    pub fn resolve(&mut self, name: &str) -> Result<Address, SimError> {
        let address = match name {
            "protocol" => self.series.params.protocol,
            "router" => self.series.router.address(),
            "ledger" => self.series.ledger.address(),
            other => resolve_label(other)?,
        };
        if !name.starts_with("0x") {
            self.labels.entry(address).or_insert_with(|| name.to_string());
        }
        Ok(address)
    }

    /// Known actor labels by address.
    pub fn labels(&self) -> &BTreeMap<Address, String> {
        &self.labels
    }

    /// Run one step and describe its result.
    pub fn apply(&mut self, step: &Step) -> Result<String, SimError> {
        let ledger = self.series.ledger.clone();
        let router = self.series.router.clone();
        match step {
            Step::Fund { account, amount } => {
                let (to, amount) = (self.resolve(account)?, parse_units(amount)?);
                self.bank.mint(to, amount)?;
                Ok(format!("funded {}", format_units(amount)))
            }
            Step::Deposit { payer, amount } => {
                router.deposit(self.resolve(payer)?, parse_units(amount)?)?;
                Ok(format!("pending {}", format_units(router.pending_to_route())))
            }
            Step::Send { from, to, amount } => {
                let (from, to, amount) = (self.resolve(from)?, self.resolve(to)?, parse_units(amount)?);
                self.bank.send(from, to, amount)?;
                Ok(format!("sent {}", format_units(amount)))
            }
            Step::Route => Ok(describe_route(&router.route_revenue()?)),
            Step::ReceiveAndRoute { payer, amount } => {
                let outcome = router.receive_and_route(self.resolve(payer)?, parse_units(amount)?)?;
                Ok(describe_route(&outcome))
            }
            Step::Distribute { caller, amount } => {
                let amount = parse_units(amount)?;
                ledger.distribute(self.resolve(caller)?, amount)?;
                Ok(format!("distributed {}", format_units(amount)))
            }
            Step::Transfer { from, to, amount } => {
                let amount = parse_units(amount)?;
                ledger.transfer(self.resolve(from)?, self.resolve(to)?, amount)?;
                Ok(format!("transferred {}", format_units(amount)))
            }
            Step::Approve { owner, spender, amount } => {
                let amount = parse_units(amount)?;
                ledger.approve(self.resolve(owner)?, self.resolve(spender)?, amount)?;
                Ok(format!("approved {}", format_units(amount)))
            }
            Step::TransferFrom { spender, from, to, amount } => {
                let amount = parse_units(amount)?;
                let (spender, from, to) = (self.resolve(spender)?, self.resolve(from)?, self.resolve(to)?);
                ledger.transfer_from(spender, from, to, amount)?;
                Ok(format!("transferred {}", format_units(amount)))
            }
            Step::Claim { holder } => {
                let paid = ledger.claim(self.resolve(holder)?)?;
                Ok(format!("claimed {}", format_units(paid)))
            }
            Step::ClaimFor { caller, user } => {
                let paid = ledger.claim_for(self.resolve(caller)?, self.resolve(user)?)?;
                Ok(format!("claimed {}", format_units(paid)))
            }
            Step::Advance { days, seconds } => {
                let secs = days
                    .checked_mul(SECONDS_PER_DAY)
                    .and_then(|d| d.checked_add(*seconds))
                    .ok_or(SimError::Overflow("advance"))?;
                let now = self.clock.advance(secs);
                Ok(format!("now {now}"))
            }
            Step::Mature { caller } => {
                ledger.mature_series(self.resolve(caller)?)?;
                Ok("matured".to_string())
            }
            Step::Withdraw { caller, amount } => {
                let amount = parse_units(amount)?;
                router.withdraw_to_protocol(self.resolve(caller)?, amount)?;
                Ok(format!("withdrew {}", format_units(amount)))
            }
            Step::WithdrawAll { caller } => {
                let amount = router.withdraw_all_to_protocol(self.resolve(caller)?)?;
                Ok(format!("withdrew {}", format_units(amount)))
            }
            Step::EmergencyWithdraw { caller, to } => {
                let amount = router.emergency_withdraw(self.resolve(caller)?, self.resolve(to)?)?;
                Ok(format!("withdrew {}", format_units(amount)))
            }
            Step::Pause { caller } => {
                router.pause(self.resolve(caller)?)?;
                Ok("paused".to_string())
            }
            Step::Unpause { caller } => {
                router.unpause(self.resolve(caller)?)?;
                Ok("unpaused".to_string())
            }
            Step::Refuse { account } => {
                let address = self.resolve(account)?;
                if address == router.address() || address == ledger.address() {
                    return Err(SimError::ProtectedAccount(address));
                }
                let hook = Arc::new(RefusingAccount);
                self.bank.register(address, &hook);
                self.refusing.insert(address, hook);
                Ok("refusing value".to_string())
            }
            Step::Accept { account } => {
                let address = self.resolve(account)?;
                if self.refusing.remove(&address).is_some() {
                    self.bank.unregister(address);
                }
                Ok("accepting value".to_string())
            }
        }
    }

    /// Run every step, recording each outcome.
    pub fn run(&mut self, scenario: &Scenario) -> Vec<StepOutcome> {
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let (ok, detail) = match self.apply(step) {
                    Ok(detail) => (true, detail),
                    Err(e) => (false, e.to_string()),
                };
                debug!(index, ok, %detail, "step");
                StepOutcome { index, step: step.clone(), ok, detail }
            })
            .collect()
    }

    pub fn report(&self, steps: Vec<StepOutcome>) -> Report {
        Report::collect(self, steps)
    }
}

fn describe_route(outcome: &RouteOutcome) -> String {
    match outcome {
        RouteOutcome::Forwarded { ledger_share, protocol_share, .. } => format!(
            "routed {} to ledger, kept {}",
            format_units(*ledger_share),
            format_units(*protocol_share)
        ),
        RouteOutcome::Failed { amount, reason, .. } => {
            format!("route failed, retained {}: {reason}", format_units(*amount))
        }
    }
}

/// Deploy from `config`, run `scenario`, and report.
pub fn run_scenario(config: &SimConfig, scenario: &Scenario) -> Result<Report, SimError> {
    let mut sim = Simulation::new(config)?;
    info!(
        name = scenario.name.as_deref().unwrap_or("unnamed"),
        steps = scenario.steps.len(),
        "running scenario"
    );
    let steps = sim.run(scenario);
    Ok(sim.report(steps))
}
