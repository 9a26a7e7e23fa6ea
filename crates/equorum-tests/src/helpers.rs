//! Shared fixtures for the integration suites.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use equorum_core::constants::{SECONDS_PER_DAY, UNIT};
use equorum_core::error::{LedgerError, RouterError, SinkFailure};
use equorum_core::params::{SeriesBounds, SeriesParams};
use equorum_core::{Address, Bank, CallBudget, ManualClock, RevenueSink, ValueReceiver};
use equorum_ledger::RevenueLedger;
use equorum_router::RevenueRouter;
use equorum_sim::{DeployOptions, Series, deploy_series};

/// Clock start for every fixture.
pub const GENESIS: u64 = 1_700_000_000;

/// Series lifetime for every fixture.
pub const MATURITY_DAYS: u64 = 365;

/// Fixed claim-token supply for every fixture.
pub const SUPPLY: u128 = 1_000_000 * UNIT;

pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

pub fn protocol() -> Address {
    addr("protocol")
}

pub fn payer() -> Address {
    addr("payer")
}

/// Parameters of the standard test series at `share_bps`.
pub fn params(share_bps: u16) -> SeriesParams {
    SeriesParams {
        name: "Test Series".into(),
        symbol: "TST".into(),
        protocol: protocol(),
        router: addr("router:TST"),
        share_bps,
        maturity_duration_secs: MATURITY_DAYS * SECONDS_PER_DAY,
        total_supply: SUPPLY,
        minimum_distribution: 1,
    }
}

/// A deployed series on a fresh bank and clock.
pub struct Fixture {
    pub bank: Arc<Bank>,
    pub clock: Arc<ManualClock>,
    pub series: Series,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::with_share(2_000)
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_share(share_bps: u16) -> Self {
        let bank = Bank::shared();
        let clock = Arc::new(ManualClock::new(GENESIS));
        let series = deploy_series(
            &params(share_bps),
            &SeriesBounds::default(),
            DeployOptions::default(),
            bank.clone(),
            clock.clone(),
        )
        .expect("standard series deploys");
        Self { bank, clock, series }
    }

    pub fn ledger(&self) -> &Arc<RevenueLedger> {
        &self.series.ledger
    }

    pub fn router(&self) -> &Arc<RevenueRouter> {
        &self.series.router
    }

    pub fn fund(&self, to: Address, amount: u128) {
        self.bank.mint(to, amount).expect("mint");
    }

    /// Move `amount` claim tokens from the protocol to `to`.
    pub fn give_tokens(&self, to: Address, amount: u128) {
        self.ledger().transfer(protocol(), to, amount).expect("protocol holds the supply");
    }

    /// Fund the payer and push `amount` through the router.
    pub fn pay_revenue(&self, amount: u128) -> equorum_router::RouteOutcome {
        self.fund(payer(), amount);
        self.router().receive_and_route(payer(), amount).expect("route")
    }

    pub fn advance_days(&self, days: u64) {
        self.clock.advance(days * SECONDS_PER_DAY);
    }

    /// Move the clock to exactly the ledger's maturity timestamp.
    pub fn jump_to_maturity(&self) {
        self.clock.set(self.ledger().maturity_timestamp());
    }

    /// Every accounting invariant of the pair, checked against live state.
    pub fn assert_invariants(&self) {
        let ledger = self.ledger();
        assert!(self.router().is_conserved(), "router conservation: {:?}", self.router().stats());
        assert!(
            ledger.value_balance() >= ledger.total_outstanding_claimable(),
            "ledger solvency: value {} < owed {}",
            ledger.value_balance(),
            ledger.total_outstanding_claimable()
        );
        assert_eq!(ledger.total_balances(), ledger.total_supply(), "supply");
        assert_eq!(
            ledger.value_balance() + ledger.total_claimed(),
            ledger.total_revenue_received(),
            "ledger value accounting"
        );
        assert_eq!(self.bank.in_flight(), 0, "value left in flight");
    }
}

// ---------------------------------------------------------------------------
// Receivers
// ---------------------------------------------------------------------------

/// Account whose acceptance of incoming value can be switched at runtime.
#[derive(Default)]
pub struct Toggle {
    refuse: AtomicBool,
    received: Mutex<u128>,
}

impl Toggle {
    pub fn install(bank: &Bank, address: Address) -> Arc<Self> {
        let toggle = Arc::new(Self::default());
        bank.register(address, &toggle);
        toggle
    }

    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn received(&self) -> u128 {
        *self.received.lock()
    }
}

impl ValueReceiver for Toggle {
    fn receive(&self, _from: Address, amount: u128) -> Result<(), String> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err("refusing".to_string());
        }
        *self.received.lock() += amount;
        Ok(())
    }
}

/// Holder that tries to claim again from inside its own payout.
pub struct ReentrantClaimer {
    pub address: Address,
    ledger: Weak<RevenueLedger>,
    pub attempts: Mutex<Vec<Result<u128, LedgerError>>>,
}

impl ReentrantClaimer {
    pub fn install(bank: &Bank, ledger: &Arc<RevenueLedger>, address: Address) -> Arc<Self> {
        let claimer = Arc::new(Self {
            address,
            ledger: Arc::downgrade(ledger),
            attempts: Mutex::new(Vec::new()),
        });
        bank.register(address, &claimer);
        claimer
    }
}

impl ValueReceiver for ReentrantClaimer {
    fn receive(&self, _from: Address, _amount: u128) -> Result<(), String> {
        if let Some(ledger) = self.ledger.upgrade() {
            let attempt = ledger.claim(self.address);
            self.attempts.lock().push(attempt);
        }
        Ok(())
    }
}

/// Recipient that calls back into the router while being paid.
pub struct RouterReentrant {
    router: Weak<RevenueRouter>,
    pub attempts: Mutex<Vec<Result<u128, RouterError>>>,
}

impl RouterReentrant {
    pub fn install(bank: &Bank, router: &Arc<RevenueRouter>, address: Address) -> Arc<Self> {
        let hook = Arc::new(Self { router: Arc::downgrade(router), attempts: Mutex::new(Vec::new()) });
        bank.register(address, &hook);
        hook
    }
}

impl ValueReceiver for RouterReentrant {
    fn receive(&self, _from: Address, _amount: u128) -> Result<(), String> {
        if let Some(router) = self.router.upgrade() {
            let attempt = router.withdraw_all_to_protocol(protocol());
            self.attempts.lock().push(attempt);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// How a [`HostileSink`] misbehaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hostility {
    /// Return an error without collecting.
    Revert,
    /// Panic mid-call.
    Panic,
    /// Charge more work than any budget allows.
    Exhaust,
}

pub struct HostileSink {
    pub address: Address,
    pub mode: Hostility,
}

impl HostileSink {
    pub fn new(mode: Hostility) -> Arc<Self> {
        Arc::new(Self { address: addr("hostile-sink"), mode })
    }
}

impl RevenueSink for HostileSink {
    fn sink_address(&self) -> Address {
        self.address
    }

    fn distribute(&self, _caller: Address, _amount: u128, budget: &mut CallBudget) -> Result<(), SinkFailure> {
        match self.mode {
            Hostility::Revert => Err(SinkFailure::Reverted("sink is closed".to_string())),
            Hostility::Panic => panic!("sink exploded"),
            Hostility::Exhaust => {
                budget.charge(u64::MAX)?;
                Ok(())
            }
        }
    }
}

/// Router bound to `sink` instead of a ledger.
pub fn router_with_sink(bank: &Arc<Bank>, share_bps: u16, sink: Arc<dyn RevenueSink>) -> Arc<RevenueRouter> {
    let router = RevenueRouter::new(
        equorum_router::RouterParams::new(addr("router:hostile"), protocol(), share_bps),
        bank.clone(),
    )
    .expect("router");
    router.bind_ledger(protocol(), sink).expect("bind");
    router
}
