//! Revenue router for one series.
//!
//! Value enters through [`RevenueRouter::deposit`] or a plain transfer to the
//! router address, and waits in `pending_to_route` until
//! [`RevenueRouter::route_revenue`] splits it. The ledger share is offered to
//! the bound [`RevenueSink`]; whatever the sink does not collect stays in the
//! router as protocol funds.
//!
//! Conservation holds after every call:
//! `total_routed_to_ledger + total_returned_to_protocol + balance == total_received`.
//! The router measures what the sink actually collected rather than trusting
//! its return value, so a misbehaving sink cannot break the equation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use equorum_core::constants::{BPS_PRECISION, MAX_FAILURE_REASON_LEN, ROUTE_CALL_BUDGET};
use equorum_core::error::{RouterError, SinkFailure, truncate_reason};
use equorum_core::events::{EventLog, RouterEvent};
use equorum_core::guard::GuardToken;
use equorum_core::math::apply_bps;
use equorum_core::{Address, Bank, CallBudget, ReentrancyGuard, RevenueSink, ValueReceiver};

/// Construction parameters for a [`RevenueRouter`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RouterParams {
    /// Address the router holds value under.
    pub address: Address,
    /// Treasury receiving withdrawals.
    pub protocol: Address,
    /// Administrative owner.
    pub owner: Address,
    /// Ledger share of every routed amount, in basis points (0..=10000).
    pub share_bps: u16,
    /// Work budget for each forwarding call.
    pub call_budget: u64,
}

impl RouterParams {
    /// Parameters with the owner set to the protocol and the default budget.
    pub fn new(address: Address, protocol: Address, share_bps: u16) -> Self {
        Self { address, protocol, owner: protocol, share_bps, call_budget: ROUTE_CALL_BUDGET }
    }
}

/// Result of a routing attempt that did not fail validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// The sink collected its full share.
    Forwarded { amount: u128, ledger_share: u128, protocol_share: u128 },
    /// The sink failed. Everything it did not collect stays with the router.
    Failed { amount: u128, ledger_share: u128, collected: u128, reason: String },
}

impl RouteOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::Forwarded { .. })
    }
}

/// Serialisable snapshot of the router's counters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RouterStats {
    pub address: Address,
    pub protocol: Address,
    pub owner: Address,
    pub ledger: Option<Address>,
    pub share_bps: u16,
    pub balance: u128,
    pub pending_to_route: u128,
    pub available_balance: u128,
    pub total_received: u128,
    pub total_routed_to_ledger: u128,
    pub total_returned_to_protocol: u128,
    pub failed_route_attempts: u64,
    pub last_failure_reason: Option<String>,
    pub paused: bool,
}

struct RouterState {
    ledger: Option<Arc<dyn RevenueSink>>,
    owner: Address,
    paused: bool,
    total_received: u128,
    total_routed_to_ledger: u128,
    total_returned_to_protocol: u128,
    pending_to_route: u128,
    failed_route_attempts: u64,
    last_failure_reason: Option<String>,
}

/// Splits deposits between a ledger and the protocol, isolating ledger failures.
pub struct RevenueRouter {
    address: Address,
    protocol: Address,
    share_bps: u16,
    call_budget: u64,
    state: Mutex<RouterState>,
    guard: ReentrancyGuard,
    events: EventLog<RouterEvent>,
    bank: Arc<Bank>,
}

impl RevenueRouter {
    /// Create the router and register it as the receive hook for its address.
    /// The ledger is bound later with [`bind_ledger`](Self::bind_ledger).
    pub fn new(params: RouterParams, bank: Arc<Bank>) -> Result<Arc<Self>, RouterError> {
        if params.share_bps > BPS_PRECISION {
            return Err(RouterError::InvalidShare { bps: params.share_bps });
        }
        if params.address.is_zero() || params.protocol.is_zero() || params.owner.is_zero() {
            return Err(RouterError::InvalidAddress);
        }
        // Paying itself would run its own deposit hook and count the value twice.
        if params.protocol == params.address {
            return Err(RouterError::SelfPayout);
        }

        let router = Arc::new(Self {
            address: params.address,
            protocol: params.protocol,
            share_bps: params.share_bps,
            call_budget: params.call_budget,
            state: Mutex::new(RouterState {
                ledger: None,
                owner: params.owner,
                paused: false,
                total_received: 0,
                total_routed_to_ledger: 0,
                total_returned_to_protocol: 0,
                pending_to_route: 0,
                failed_route_attempts: 0,
                last_failure_reason: None,
            }),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
            bank: bank.clone(),
        });
        bank.register(params.address, &router);
        Ok(router)
    }

    fn enter(&self) -> Result<GuardToken<'_>, RouterError> {
        self.guard.enter().map_err(|_| RouterError::Reentrancy)
    }

    fn ensure_admin(&self, caller: Address) -> Result<(), RouterError> {
        if caller == self.protocol || caller == self.state.lock().owner {
            Ok(())
        } else {
            Err(RouterError::NotAuthorized { caller })
        }
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), RouterError> {
        if caller == self.state.lock().owner {
            Ok(())
        } else {
            Err(RouterError::NotAuthorized { caller })
        }
    }

    // ------------------------------------------------------------------
    // Receiving
    // ------------------------------------------------------------------

    /// Accept `amount` from `payer` as call value.
    ///
    /// Never blocked by pausing and never guarded: funds are always accepted.
    pub fn deposit(&self, payer: Address, amount: u128) -> Result<(), RouterError> {
        if amount == 0 {
            return Err(RouterError::NoValue);
        }
        let mut state = self.state.lock();
        let (total_received, pending) = Self::credited(&state, amount)?;
        self.bank.attach(payer, self.address, amount)?;
        state.total_received = total_received;
        state.pending_to_route = pending;
        drop(state);

        self.events.emit(RouterEvent::RevenueReceived { from: payer, amount, pending_to_route: pending });
        debug!(%payer, amount, pending, "revenue received");
        Ok(())
    }

    fn credited(state: &RouterState, amount: u128) -> Result<(u128, u128), RouterError> {
        let total = state.total_received.checked_add(amount).ok_or(RouterError::ArithmeticOverflow)?;
        let pending = state.pending_to_route.checked_add(amount).ok_or(RouterError::ArithmeticOverflow)?;
        Ok((total, pending))
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    /// Split everything pending and forward the ledger share.
    ///
    /// Permissionless. A failing sink does not make this call fail: the
    /// failure is counted, logged and returned as [`RouteOutcome::Failed`],
    /// and `pending_to_route` is cleared either way.
    ///
    /// # Errors
    ///
    /// - [`RouterError::Paused`] while paused
    /// - [`RouterError::LedgerNotBound`] before a ledger is bound
    /// - [`RouterError::NoPendingRevenue`] if nothing is pending
    pub fn route_revenue(&self) -> Result<RouteOutcome, RouterError> {
        let _guard = self.enter()?;
        if self.state.lock().paused {
            return Err(RouterError::Paused);
        }
        self.route_inner()
    }

    /// Deposit `amount` from `payer` and route immediately. Blocked while paused.
    pub fn receive_and_route(&self, payer: Address, amount: u128) -> Result<RouteOutcome, RouterError> {
        let _guard = self.enter()?;
        if self.state.lock().paused {
            return Err(RouterError::Paused);
        }
        self.deposit(payer, amount)?;
        self.route_inner()
    }

    fn route_inner(&self) -> Result<RouteOutcome, RouterError> {
        let (sink, amount, ledger_share) = {
            let mut state = self.state.lock();
            let sink = state.ledger.clone().ok_or(RouterError::LedgerNotBound)?;
            if state.pending_to_route == 0 {
                return Err(RouterError::NoPendingRevenue);
            }
            let ledger_share =
                apply_bps(state.pending_to_route, self.share_bps).ok_or(RouterError::ArithmeticOverflow)?;
            (sink, std::mem::take(&mut state.pending_to_route), ledger_share)
        };
        let protocol_share = amount - ledger_share;

        if ledger_share == 0 {
            self.events.emit(RouterEvent::RevenueRouted { to_ledger: 0, protocol_share });
            debug!(amount, "ledger share rounds to zero, nothing forwarded");
            return Ok(RouteOutcome::Forwarded { amount, ledger_share, protocol_share });
        }

        let (balance_before, received_before) = {
            let state = self.state.lock();
            (self.bank.balance_of(self.address), state.total_received)
        };

        let mut budget = CallBudget::new(self.call_budget);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sink.distribute(self.address, ledger_share, &mut budget)
        }))
        .unwrap_or_else(|payload| Err(SinkFailure::Panicked(panic_message(payload.as_ref()))));

        // Deposits may land while the sink runs; they raise the balance and
        // `total_received` together.
        let mut state = self.state.lock();
        let deposited_meanwhile = state.total_received - received_before;
        let collected = (balance_before + deposited_meanwhile)
            .saturating_sub(self.bank.balance_of(self.address));
        state.total_routed_to_ledger += collected;

        let failure = match result {
            Ok(()) if collected == ledger_share => None,
            Ok(()) => Some(format!("sink collected {collected} of {ledger_share}")),
            Err(failure) => Some(failure.to_string()),
        };

        match failure {
            None => {
                drop(state);
                self.events.emit(RouterEvent::RevenueRouted { to_ledger: ledger_share, protocol_share });
                info!(amount, ledger_share, protocol_share, "revenue routed");
                Ok(RouteOutcome::Forwarded { amount, ledger_share, protocol_share })
            }
            Some(reason) => {
                let reason = truncate_reason(&reason, MAX_FAILURE_REASON_LEN);
                state.failed_route_attempts += 1;
                state.last_failure_reason = Some(reason.clone());
                let attempts = state.failed_route_attempts;
                drop(state);

                self.events.emit(RouterEvent::RouteFailed { amount, ledger_share, reason: reason.clone() });
                warn!(amount, ledger_share, collected, attempts, %reason, "route to ledger failed, value retained");
                Ok(RouteOutcome::Failed { amount, ledger_share, collected, reason })
            }
        }
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    /// Send `amount` of the available balance to the protocol.
    ///
    /// Callable by the protocol or the owner, and only when nothing is
    /// pending. Works while paused.
    pub fn withdraw_to_protocol(&self, caller: Address, amount: u128) -> Result<(), RouterError> {
        let _guard = self.enter()?;
        self.ensure_admin(caller)?;
        self.ensure_nothing_pending()?;
        if amount == 0 {
            return Err(RouterError::NoValue);
        }
        let available = self.available_balance();
        if amount > available {
            return Err(RouterError::InsufficientAvailableBalance { available, requested: amount });
        }
        self.pay_out(self.protocol, amount)?;
        self.events.emit(RouterEvent::WithdrawnToProtocol { to: self.protocol, amount });
        info!(%caller, amount, "withdrawn to protocol");
        Ok(())
    }

    /// Send the whole available balance to the protocol. Returns the amount.
    pub fn withdraw_all_to_protocol(&self, caller: Address) -> Result<u128, RouterError> {
        let _guard = self.enter()?;
        self.ensure_admin(caller)?;
        self.ensure_nothing_pending()?;
        let amount = self.available_balance();
        if amount == 0 {
            return Err(RouterError::NoAvailableBalance);
        }
        self.pay_out(self.protocol, amount)?;
        self.events.emit(RouterEvent::WithdrawnToProtocol { to: self.protocol, amount });
        info!(%caller, amount, "withdrawn to protocol");
        Ok(amount)
    }

    /// Owner-only escape hatch: send the available balance to `to`.
    ///
    /// Pending revenue is never touched and stays routable. The amount counts
    /// as returned to the protocol side.
    pub fn emergency_withdraw(&self, caller: Address, to: Address) -> Result<u128, RouterError> {
        let _guard = self.enter()?;
        self.ensure_owner(caller)?;
        if to.is_zero() {
            return Err(RouterError::InvalidAddress);
        }
        if to == self.address {
            return Err(RouterError::SelfPayout);
        }
        let amount = self.available_balance();
        if amount == 0 {
            return Err(RouterError::NoAvailableBalance);
        }
        self.pay_out(to, amount)?;
        self.events.emit(RouterEvent::EmergencyWithdrawal { to, amount });
        warn!(%caller, %to, amount, "emergency withdrawal");
        Ok(amount)
    }

    fn ensure_nothing_pending(&self) -> Result<(), RouterError> {
        match self.state.lock().pending_to_route {
            0 => Ok(()),
            pending => Err(RouterError::PendingRevenueMustRouteFirst { pending }),
        }
    }

    /// Count `amount` as returned, then send it. The counter is restored if
    /// the recipient refuses.
    fn pay_out(&self, to: Address, amount: u128) -> Result<(), RouterError> {
        {
            let mut state = self.state.lock();
            state.total_returned_to_protocol = state
                .total_returned_to_protocol
                .checked_add(amount)
                .ok_or(RouterError::ArithmeticOverflow)?;
        }
        if let Err(err) = self.bank.send(self.address, to, amount) {
            self.state.lock().total_returned_to_protocol -= amount;
            warn!(%to, amount, "withdrawal refused by recipient");
            return Err(err.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Bind the downstream ledger. Allowed once, by the owner or protocol.
    pub fn bind_ledger(&self, caller: Address, ledger: Arc<dyn RevenueSink>) -> Result<(), RouterError> {
        let _guard = self.enter()?;
        self.ensure_admin(caller)?;
        let ledger_address = ledger.sink_address();
        if ledger_address.is_zero() {
            return Err(RouterError::InvalidAddress);
        }
        let mut state = self.state.lock();
        if let Some(bound) = &state.ledger {
            return Err(RouterError::LedgerAlreadyBound(bound.sink_address()));
        }
        state.ledger = Some(ledger);
        drop(state);

        self.events.emit(RouterEvent::LedgerBound { ledger: ledger_address });
        info!(router = %self.address, ledger = %ledger_address, "ledger bound");
        Ok(())
    }

    /// Block the forwarding path. Deposits and withdrawals keep working.
    pub fn pause(&self, caller: Address) -> Result<(), RouterError> {
        let _guard = self.enter()?;
        self.ensure_admin(caller)?;
        let mut state = self.state.lock();
        if state.paused {
            return Err(RouterError::AlreadyPaused);
        }
        state.paused = true;
        drop(state);
        self.events.emit(RouterEvent::Paused { by: caller });
        info!(%caller, "router paused");
        Ok(())
    }

    pub fn unpause(&self, caller: Address) -> Result<(), RouterError> {
        let _guard = self.enter()?;
        self.ensure_admin(caller)?;
        let mut state = self.state.lock();
        if !state.paused {
            return Err(RouterError::NotPaused);
        }
        state.paused = false;
        drop(state);
        self.events.emit(RouterEvent::Unpaused { by: caller });
        info!(%caller, "router unpaused");
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), RouterError> {
        let _guard = self.enter()?;
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(RouterError::InvalidAddress);
        }
        let previous = std::mem::replace(&mut self.state.lock().owner, new_owner);
        self.events.emit(RouterEvent::OwnershipTransferred { previous, new_owner });
        info!(%previous, %new_owner, "router ownership transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn protocol(&self) -> Address {
        self.protocol
    }

    pub fn owner(&self) -> Address {
        self.state.lock().owner
    }

    pub fn share_bps(&self) -> u16 {
        self.share_bps
    }

    pub fn ledger_address(&self) -> Option<Address> {
        self.state.lock().ledger.as_ref().map(|l| l.sink_address())
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Value held by the router in the bank.
    pub fn balance(&self) -> u128 {
        self.bank.balance_of(self.address)
    }

    pub fn pending_to_route(&self) -> u128 {
        self.state.lock().pending_to_route
    }

    /// Balance not earmarked for routing.
    pub fn available_balance(&self) -> u128 {
        let pending = self.state.lock().pending_to_route;
        self.balance().saturating_sub(pending)
    }

    pub fn total_received(&self) -> u128 {
        self.state.lock().total_received
    }

    pub fn total_routed_to_ledger(&self) -> u128 {
        self.state.lock().total_routed_to_ledger
    }

    pub fn total_returned_to_protocol(&self) -> u128 {
        self.state.lock().total_returned_to_protocol
    }

    pub fn failed_route_attempts(&self) -> u64 {
        self.state.lock().failed_route_attempts
    }

    pub fn last_failure_reason(&self) -> Option<String> {
        self.state.lock().last_failure_reason.clone()
    }

    /// Whether routed + returned + balance equals everything received.
    pub fn is_conserved(&self) -> bool {
        let balance = self.balance();
        let state = self.state.lock();
        state
            .total_routed_to_ledger
            .checked_add(state.total_returned_to_protocol)
            .and_then(|sum| sum.checked_add(balance))
            == Some(state.total_received)
    }

    pub fn stats(&self) -> RouterStats {
        let balance = self.balance();
        let state = self.state.lock();
        RouterStats {
            address: self.address,
            protocol: self.protocol,
            owner: state.owner,
            ledger: state.ledger.as_ref().map(|l| l.sink_address()),
            share_bps: self.share_bps,
            balance,
            pending_to_route: state.pending_to_route,
            available_balance: balance.saturating_sub(state.pending_to_route),
            total_received: state.total_received,
            total_routed_to_ledger: state.total_routed_to_ledger,
            total_returned_to_protocol: state.total_returned_to_protocol,
            failed_route_attempts: state.failed_route_attempts,
            last_failure_reason: state.last_failure_reason.clone(),
            paused: state.paused,
        }
    }

    pub fn events(&self) -> Vec<RouterEvent> {
        self.events.snapshot()
    }

    pub fn last_event(&self) -> Option<RouterEvent> {
        self.events.last()
    }
}

/// A plain transfer to the router is a deposit.
impl ValueReceiver for RevenueRouter {
    fn receive(&self, from: Address, amount: u128) -> Result<(), String> {
        if amount == 0 {
            return Err(RouterError::NoValue.to_string());
        }
        let mut state = self.state.lock();
        let (total_received, pending) = Self::credited(&state, amount).map_err(|e| e.to_string())?;
        state.total_received = total_received;
        state.pending_to_route = pending;
        drop(state);

        self.events.emit(RouterEvent::RevenueReceived { from, amount, pending_to_route: pending });
        debug!(%from, amount, pending, "revenue received by transfer");
        Ok(())
    }
}

impl std::fmt::Debug for RevenueRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevenueRouter")
            .field("address", &self.address)
            .field("protocol", &self.protocol)
            .field("share_bps", &self.share_bps)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
