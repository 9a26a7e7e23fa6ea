//! The claim-token ledger for one revenue series.
//!
//! [`RevenueLedger`] holds a fixed supply of claim tokens and the value
//! deposited for their holders. Deposits arrive only through
//! [`RevenueLedger::distribute`] (directly or via the [`RevenueSink`] seam the
//! router uses); plain value transfers into the ledger are refused by its
//! [`ValueReceiver`] hook.
//!
//! Every state-mutating entry point holds the ledger's [`ReentrancyGuard`]
//! for the whole call. A payout hook that calls back into the ledger is
//! therefore rejected with [`LedgerError::Reentrancy`], and a failed payout
//! can restore the exact pre-call state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use equorum_core::constants::{DISTRIBUTE_CALL_COST, TOKEN_DECIMALS};
use equorum_core::error::{BankError, LedgerError, ParamsError, SinkFailure};
use equorum_core::events::{EventLog, LedgerEvent};
use equorum_core::guard::GuardToken;
use equorum_core::params::SeriesParams;
use equorum_core::{Address, Bank, CallBudget, Clock, ReentrancyGuard, RevenueSink, ValueReceiver};

use crate::accrual::{HolderAccount, index_delta};

/// Reason returned to anyone sending plain value to the ledger.
const DIRECT_VALUE_REFUSED: &str = "direct value transfers are not accepted; use distribute";

/// Serialisable snapshot of a series.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SeriesInfo {
    pub name: String,
    pub symbol: String,
    pub protocol: Address,
    pub router: Address,
    pub share_bps: u16,
    pub total_supply: u128,
    pub total_revenue_received: u128,
    pub total_claimed: u128,
    pub accrual_index: u128,
    pub maturity_timestamp: u64,
    /// Whether `mature_series` has not yet run.
    pub active: bool,
    /// Whether a distribution would pass the lifecycle checks right now.
    pub accepting_deposits: bool,
    pub time_remaining: u64,
}

#[derive(Debug)]
struct LedgerState {
    accounts: HashMap<Address, HolderAccount>,
    /// `(owner, spender)` → remaining allowance.
    allowances: HashMap<(Address, Address), u128>,
    accrual_index: u128,
    total_revenue_received: u128,
    total_claimed: u128,
    active: bool,
    owner: Address,
}

impl LedgerState {
    fn account(&self, address: Address) -> HolderAccount {
        self.accounts.get(&address).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    /// Move `amount` tokens from `from` to `to`, folding both accounts at the
    /// current index first. All checks run before anything is written.
    fn move_tokens(&mut self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let index = self.accrual_index;
        let mut sender = self.account(from);
        if sender.balance < amount {
            return Err(LedgerError::InsufficientBalance { have: sender.balance, need: amount });
        }
        sender.fold(index).ok_or(LedgerError::ArithmeticOverflow)?;

        if from == to {
            self.accounts.insert(from, sender);
            return Ok(());
        }

        let mut receiver = self.account(to);
        receiver.fold(index).ok_or(LedgerError::ArithmeticOverflow)?;
        sender.balance -= amount;
        receiver.balance = receiver
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.accounts.insert(from, sender);
        self.accounts.insert(to, receiver);
        Ok(())
    }
}

/// Proportional revenue-sharing claim-token ledger.
pub struct RevenueLedger {
    address: Address,
    name: String,
    symbol: String,
    protocol: Address,
    router: Address,
    share_bps: u16,
    total_supply: u128,
    minimum_distribution: u128,
    maturity_timestamp: u64,
    state: Mutex<LedgerState>,
    guard: ReentrancyGuard,
    events: EventLog<LedgerEvent>,
    bank: Arc<Bank>,
    clock: Arc<dyn Clock>,
}

impl RevenueLedger {
    /// Create the ledger at `address` and register its receive hook.
    ///
    /// The full supply is assigned to `params.protocol`, which is also the
    /// initial owner. Maturity is `clock.now() + maturity_duration_secs`.
    /// Only the invariants the ledger itself depends on are checked here;
    /// deployment bounds are applied by [`SeriesParams::validate`].
    pub fn new(
        address: Address,
        params: &SeriesParams,
        bank: Arc<Bank>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, ParamsError> {
        if params.total_supply == 0 {
            return Err(ParamsError::SupplyOutOfBounds { supply: 0, min: 1, max: u128::MAX });
        }
        if params.protocol.is_zero() {
            return Err(ParamsError::NullProtocol);
        }
        if params.router.is_zero() {
            return Err(ParamsError::NullRouter);
        }

        let created_at = clock.now();
        let mut accounts = HashMap::new();
        accounts.insert(
            params.protocol,
            HolderAccount { balance: params.total_supply, ..HolderAccount::default() },
        );

        let ledger = Arc::new(Self {
            address,
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            protocol: params.protocol,
            router: params.router,
            share_bps: params.share_bps,
            total_supply: params.total_supply,
            minimum_distribution: params.minimum_distribution,
            maturity_timestamp: created_at.saturating_add(params.maturity_duration_secs),
            state: Mutex::new(LedgerState {
                accounts,
                allowances: HashMap::new(),
                accrual_index: 0,
                total_revenue_received: 0,
                total_claimed: 0,
                active: true,
                owner: params.protocol,
            }),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
            bank: bank.clone(),
            clock,
        });
        bank.register(address, &ledger);

        ledger.events.emit(LedgerEvent::Transfer {
            from: Address::ZERO,
            to: params.protocol,
            amount: params.total_supply,
        });
        info!(
            ledger = %address,
            symbol = %ledger.symbol,
            supply = params.total_supply,
            maturity = ledger.maturity_timestamp,
            "series created"
        );
        Ok(ledger)
    }

    fn enter(&self) -> Result<GuardToken<'_>, LedgerError> {
        self.guard.enter().map_err(|_| LedgerError::Reentrancy)
    }

    // ------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------

    /// Accept `amount` of value from `caller` as a new distribution.
    ///
    /// Only the protocol and the paired router may distribute; ownership of
    /// the ledger plays no part. The value moves from `caller` to the ledger
    /// as call value. Cost is O(1) in the number of holders.
    ///
    /// # Errors
    ///
    /// Checked in order: [`LedgerError::NotAuthorized`], [`LedgerError::NoValue`],
    /// [`LedgerError::DistributionTooSmall`], [`LedgerError::SeriesMatured`]
    /// (at or past the maturity timestamp), [`LedgerError::SeriesInactive`].
    pub fn distribute(&self, caller: Address, amount: u128) -> Result<(), LedgerError> {
        let _guard = self.enter()?;

        if caller != self.protocol && caller != self.router {
            debug!(%caller, "distribution from unauthorized caller rejected");
            return Err(LedgerError::NotAuthorized { caller });
        }
        if amount == 0 {
            return Err(LedgerError::NoValue);
        }
        if amount < self.minimum_distribution {
            return Err(LedgerError::DistributionTooSmall {
                amount,
                minimum: self.minimum_distribution,
            });
        }
        let now = self.clock.now();
        if now >= self.maturity_timestamp {
            return Err(LedgerError::SeriesMatured { maturity: self.maturity_timestamp, now });
        }

        let mut state = self.state.lock();
        if !state.active {
            return Err(LedgerError::SeriesInactive);
        }
        let delta = index_delta(amount, self.total_supply).ok_or(LedgerError::ArithmeticOverflow)?;
        let accrual_index = state
            .accrual_index
            .checked_add(delta)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let total_revenue_received = state
            .total_revenue_received
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.bank.attach(caller, self.address, amount)?;
        state.accrual_index = accrual_index;
        state.total_revenue_received = total_revenue_received;
        drop(state);

        self.events.emit(LedgerEvent::Distributed {
            caller,
            amount,
            accrual_index,
            total_revenue_received,
        });
        info!(%caller, amount, accrual_index, "revenue distributed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Pay `caller` everything it has accrued. Returns the amount paid.
    pub fn claim(&self, caller: Address) -> Result<u128, LedgerError> {
        let _guard = self.enter()?;
        self.settle_claim(caller, caller)
    }

    /// Pay `user` everything it has accrued. Anyone may trigger this; the
    /// value always goes to `user`, never to `caller`.
    ///
    /// If `user` refuses the value the call fails with
    /// [`LedgerError::PayoutFailed`] and `user`'s claimable amount is left
    /// exactly as it was.
    pub fn claim_for(&self, caller: Address, user: Address) -> Result<u128, LedgerError> {
        let _guard = self.enter()?;
        if user.is_zero() {
            return Err(LedgerError::InvalidUser);
        }
        debug!(%caller, %user, "claim relayed");
        self.settle_claim(user, user)
    }

    /// Zero `holder`'s accrued reward, then push it to `recipient`. Caller
    /// must hold the guard.
    fn settle_claim(&self, holder: Address, recipient: Address) -> Result<u128, LedgerError> {
        let (snapshot, amount) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let index = state.accrual_index;
            let before = state.account(holder);
            let amount = before.claimable(index).ok_or(LedgerError::ArithmeticOverflow)?;
            if amount == 0 {
                return Err(LedgerError::NothingToClaim { holder });
            }
            let total_claimed = state
                .total_claimed
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            state.accounts.insert(
                holder,
                HolderAccount { balance: before.balance, pending_reward: 0, last_index_seen: index },
            );
            state.total_claimed = total_claimed;
            (before, amount)
        };

        // The state lock is released here: the recipient's hook may read the ledger.
        if let Err(err) = self.bank.send(self.address, recipient, amount) {
            let mut state = self.state.lock();
            state.accounts.insert(holder, snapshot);
            state.total_claimed -= amount;
            drop(state);

            warn!(%holder, %recipient, amount, "claim payout failed, reward kept");
            return Err(match err {
                BankError::Rejected { reason, .. } => LedgerError::PayoutFailed { recipient, reason },
                other => other.into(),
            });
        }

        self.events.emit(LedgerEvent::Claimed { holder, recipient, amount });
        info!(%holder, %recipient, amount, "reward claimed");
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Mark the series inactive. Anyone may call this once the maturity
    /// timestamp is reached. Claims and transfers stay available.
    pub fn mature_series(&self, caller: Address) -> Result<(), LedgerError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        if now < self.maturity_timestamp {
            return Err(LedgerError::NotYetMatured { maturity: self.maturity_timestamp, now });
        }

        let mut state = self.state.lock();
        if !state.active {
            return Err(LedgerError::AlreadyMatured);
        }
        state.active = false;
        let total_revenue_received = state.total_revenue_received;
        drop(state);

        self.events.emit(LedgerEvent::SeriesMatured { timestamp: now, total_revenue_received });
        info!(%caller, timestamp = now, total_revenue_received, "series matured");
        Ok(())
    }

    /// Hand ledger ownership to `new_owner`. Ownership does not confer the
    /// right to distribute.
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), LedgerError> {
        let _guard = self.enter()?;
        if new_owner.is_zero() {
            return Err(LedgerError::InvalidOwner);
        }
        let mut state = self.state.lock();
        if caller != state.owner {
            return Err(LedgerError::NotOwner { caller });
        }
        let previous = std::mem::replace(&mut state.owner, new_owner);
        drop(state);

        self.events.emit(LedgerEvent::OwnershipTransferred { previous, new_owner });
        info!(%previous, %new_owner, "ledger ownership transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fungible-token surface
    // ------------------------------------------------------------------

    /// Move `amount` tokens from `caller` to `to`.
    ///
    /// Both accounts have their accrued reward folded in at the current index
    /// first, so the sender keeps what it earned and the recipient earns
    /// nothing from past deposits.
    pub fn transfer(&self, caller: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        let _guard = self.enter()?;
        self.state.lock().move_tokens(caller, to, amount)?;
        self.events.emit(LedgerEvent::Transfer { from: caller, to, amount });
        debug!(from = %caller, %to, amount, "tokens transferred");
        Ok(())
    }

    /// Move `amount` tokens from `from` to `to` on `spender`'s allowance.
    /// An allowance of `u128::MAX` is never decreased.
    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let _guard = self.enter()?;
        let mut state = self.state.lock();
        let allowed = state.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance { have: allowed, need: amount });
        }
        state.move_tokens(from, to, amount)?;
        if allowed != u128::MAX {
            state.allowances.insert((from, spender), allowed - amount);
        }
        drop(state);

        self.events.emit(LedgerEvent::Transfer { from, to, amount });
        debug!(%spender, %from, %to, amount, "tokens transferred on allowance");
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s tokens to `amount`.
    pub fn approve(&self, owner: Address, spender: Address, amount: u128) -> Result<(), LedgerError> {
        let _guard = self.enter()?;
        if spender.is_zero() {
            return Err(LedgerError::InvalidSpender);
        }
        self.state.lock().allowances.insert((owner, spender), amount);
        self.events.emit(LedgerEvent::Approval { owner, spender, amount });
        Ok(())
    }

    pub fn balance_of(&self, holder: Address) -> u128 {
        self.state.lock().account(holder).balance
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.state.lock().allowance(owner, spender)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// What `holder` would receive from `claim` right now.
    ///
    /// Saturates at `u128::MAX` instead of failing; a claim of that size
    /// would fail with [`LedgerError::ArithmeticOverflow`] anyway.
    pub fn calculate_claimable(&self, holder: Address) -> u128 {
        let state = self.state.lock();
        state.account(holder).claimable(state.accrual_index).unwrap_or(u128::MAX)
    }

    pub fn pending_reward(&self, holder: Address) -> u128 {
        self.state.lock().account(holder).pending_reward
    }

    pub fn last_index_seen(&self, holder: Address) -> u128 {
        self.state.lock().account(holder).last_index_seen
    }

    pub fn accrual_index(&self) -> u128 {
        self.state.lock().accrual_index
    }

    pub fn total_revenue_received(&self) -> u128 {
        self.state.lock().total_revenue_received
    }

    pub fn total_claimed(&self) -> u128 {
        self.state.lock().total_claimed
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn maturity_timestamp(&self) -> u64 {
        self.maturity_timestamp
    }

    /// Seconds until maturity; 0 once the timestamp is reached.
    pub fn time_remaining(&self) -> u64 {
        self.maturity_timestamp.saturating_sub(self.clock.now())
    }

    pub fn owner(&self) -> Address {
        self.state.lock().owner
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn protocol(&self) -> Address {
        self.protocol
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Value currently held by the ledger in the bank.
    pub fn value_balance(&self) -> u128 {
        self.bank.balance_of(self.address)
    }

    /// Every address with a token balance or unclaimed reward, sorted.
    pub fn holders(&self) -> Vec<Address> {
        let state = self.state.lock();
        let index = state.accrual_index;
        let mut holders: Vec<Address> = state
            .accounts
            .iter()
            .filter(|(_, a)| a.balance > 0 || a.claimable(index).is_none_or(|c| c > 0))
            .map(|(addr, _)| *addr)
            .collect();
        holders.sort();
        holders
    }

    /// Sum of `calculate_claimable` over every account, saturating.
    ///
    /// Iterates all accounts; meant for audits and tests, not for any
    /// state-changing path.
    pub fn total_outstanding_claimable(&self) -> u128 {
        let state = self.state.lock();
        let index = state.accrual_index;
        state
            .accounts
            .values()
            .map(|a| a.claimable(index).unwrap_or(u128::MAX))
            .fold(0u128, u128::saturating_add)
    }

    /// Sum of all token balances. Always equals `total_supply`.
    pub fn total_balances(&self) -> u128 {
        self.state
            .lock()
            .accounts
            .values()
            .fold(0u128, |sum, a| sum.saturating_add(a.balance))
    }

    pub fn series_info(&self) -> SeriesInfo {
        let now = self.clock.now();
        let state = self.state.lock();
        SeriesInfo {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            protocol: self.protocol,
            router: self.router,
            share_bps: self.share_bps,
            total_supply: self.total_supply,
            total_revenue_received: state.total_revenue_received,
            total_claimed: state.total_claimed,
            accrual_index: state.accrual_index,
            maturity_timestamp: self.maturity_timestamp,
            active: state.active,
            accepting_deposits: state.active && now < self.maturity_timestamp,
            time_remaining: self.maturity_timestamp.saturating_sub(now),
        }
    }

    /// Every event emitted so far, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.snapshot()
    }

    pub fn last_event(&self) -> Option<LedgerEvent> {
        self.events.last()
    }
}

impl ValueReceiver for RevenueLedger {
    fn receive(&self, from: Address, amount: u128) -> Result<(), String> {
        debug!(%from, amount, "direct value transfer refused");
        Err(DIRECT_VALUE_REFUSED.to_string())
    }
}

impl RevenueSink for RevenueLedger {
    fn sink_address(&self) -> Address {
        self.address
    }

    fn distribute(
        &self,
        caller: Address,
        amount: u128,
        budget: &mut CallBudget,
    ) -> Result<(), SinkFailure> {
        budget.charge(DISTRIBUTE_CALL_COST)?;
        RevenueLedger::distribute(self, caller, amount)
            .map_err(|e| SinkFailure::Reverted(e.to_string()))
    }
}

impl std::fmt::Debug for RevenueLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevenueLedger")
            .field("address", &self.address)
            .field("symbol", &self.symbol)
            .field("total_supply", &self.total_supply)
            .field("maturity_timestamp", &self.maturity_timestamp)
            .finish_non_exhaustive()
    }
}
