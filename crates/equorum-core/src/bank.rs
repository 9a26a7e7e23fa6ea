//! Native value host.
//!
//! The [`Bank`] owns the value balance of every address: payers, holders,
//! the protocol treasury, the router and the ledger. It offers two ways of
//! moving value:
//!
//! - [`Bank::attach`] moves value that accompanies a call (the value a
//!   caller sends together with `distribute` or `deposit`). No hook runs;
//!   the called component accounts for the value itself.
//! - [`Bank::send`] is a plain transfer. The recipient's
//!   [`ValueReceiver`] hook, if one is registered, decides whether to accept.
//!   While the hook runs the value is in flight: the sender is already
//!   debited and the recipient not yet credited. A rejection refunds the
//!   sender, so a failed transfer leaves every balance as it was.
//!
//! The bank never holds its own lock while a hook runs, so hooks may call
//! back into any component, including the bank.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::address::Address;
use crate::constants::MAX_FAILURE_REASON_LEN;
use crate::error::{truncate_reason, BankError};
use crate::traits::ValueReceiver;

#[derive(Debug, Default)]
struct BankState {
    balances: HashMap<Address, u128>,
    /// Sum of all minted value. Bounds every balance, so credits cannot overflow.
    total_minted: u128,
    /// Value debited from a sender whose recipient hook is still running.
    in_flight: u128,
}

impl BankState {
    fn debit(&mut self, address: Address, amount: u128) -> Result<(), BankError> {
        let have = self.balances.get(&address).copied().unwrap_or(0);
        if have < amount {
            return Err(BankError::InsufficientValue { address, have, need: amount });
        }
        self.balances.insert(address, have - amount);
        Ok(())
    }

    fn credit(&mut self, address: Address, amount: u128) {
        *self.balances.entry(address).or_insert(0) += amount;
    }
}

/// Shared ledger of native value with per-address receive hooks.
#[derive(Default)]
pub struct Bank {
    state: Mutex<BankState>,
    receivers: RwLock<HashMap<Address, Weak<dyn ValueReceiver>>>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning the bank behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Bring new value into the system at `to`.
    pub fn mint(&self, to: Address, amount: u128) -> Result<(), BankError> {
        let mut state = self.state.lock();
        state.total_minted = state
            .total_minted
            .checked_add(amount)
            .ok_or(BankError::ValueOverflow)?;
        state.credit(to, amount);
        Ok(())
    }

    pub fn balance_of(&self, address: Address) -> u128 {
        self.state.lock().balances.get(&address).copied().unwrap_or(0)
    }

    /// Total value ever minted. Equals the sum of all balances plus value in flight.
    pub fn total_minted(&self) -> u128 {
        self.state.lock().total_minted
    }

    pub fn in_flight(&self) -> u128 {
        self.state.lock().in_flight
    }

    /// Move call value from `from` to `to` without running any hook.
    pub fn attach(&self, from: Address, to: Address, amount: u128) -> Result<(), BankError> {
        if amount == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        state.debit(from, amount)?;
        state.credit(to, amount);
        Ok(())
    }

    /// Plain transfer from `from` to `to`, subject to the recipient's hook.
    pub fn send(&self, from: Address, to: Address, amount: u128) -> Result<(), BankError> {
        {
            let mut state = self.state.lock();
            state.debit(from, amount)?;
            state.in_flight += amount;
        }

        let verdict = match self.receiver(to) {
            Some(hook) => hook.receive(from, amount),
            None => Ok(()),
        };

        let mut state = self.state.lock();
        state.in_flight -= amount;
        match verdict {
            Ok(()) => {
                state.credit(to, amount);
                Ok(())
            }
            Err(reason) => {
                state.credit(from, amount);
                let reason = truncate_reason(&reason, MAX_FAILURE_REASON_LEN);
                debug!(%from, %to, amount, %reason, "transfer rejected by recipient");
                Err(BankError::Rejected { address: to, reason })
            }
        }
    }

    /// Attach a receive hook to `address`. The bank keeps a weak reference;
    /// once the receiver is dropped the address behaves as hook-less.
    pub fn register<R: ValueReceiver + 'static>(&self, address: Address, receiver: &Arc<R>) {
        let weak: Weak<dyn ValueReceiver> = Arc::downgrade(receiver) as Weak<dyn ValueReceiver>;
        self.receivers.write().insert(address, weak);
    }

    pub fn unregister(&self, address: Address) {
        self.receivers.write().remove(&address);
    }

    pub fn has_receiver(&self, address: Address) -> bool {
        self.receiver(address).is_some()
    }

    fn receiver(&self, address: Address) -> Option<Arc<dyn ValueReceiver>> {
        self.receivers.read().get(&address).and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Bank")
            .field("accounts", &state.balances.len())
            .field("total_minted", &state.total_minted)
            .field("in_flight", &state.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    struct Rejecting(String);

    impl ValueReceiver for Rejecting {
        fn receive(&self, _from: Address, _amount: u128) -> Result<(), String> {
            Err(self.0.clone())
        }
    }

    /// Records the balances it observes while its hook runs.
    struct Observer {
        bank: Arc<Bank>,
        me: Address,
        seen: Mutex<Option<(u128, u128, u128)>>,
    }

    impl ValueReceiver for Observer {
        fn receive(&self, from: Address, _amount: u128) -> Result<(), String> {
            *self.seen.lock() = Some((
                self.bank.balance_of(from),
                self.bank.balance_of(self.me),
                self.bank.in_flight(),
            ));
            Ok(())
        }
    }

    /// Tries to spend the sender's refunded value from inside the hook.
    struct Forwarder {
        bank: Arc<Bank>,
        me: Address,
        result: Mutex<Option<Result<(), BankError>>>,
    }

    impl ValueReceiver for Forwarder {
        fn receive(&self, _from: Address, amount: u128) -> Result<(), String> {
            *self.result.lock() = Some(self.bank.attach(self.me, addr(0xEE), amount));
            Err("refusing after trying to forward".into())
        }
    }

    #[test]
    fn mint_and_balance() {
        let bank = Bank::new();
        bank.mint(addr(1), 100).unwrap();
        bank.mint(addr(1), 50).unwrap();
        assert_eq!(bank.balance_of(addr(1)), 150);
        assert_eq!(bank.balance_of(addr(2)), 0);
        assert_eq!(bank.total_minted(), 150);
    }

    #[test]
    fn mint_overflow_rejected() {
        let bank = Bank::new();
        bank.mint(addr(1), u128::MAX).unwrap();
        assert_eq!(bank.mint(addr(2), 1), Err(BankError::ValueOverflow));
        assert_eq!(bank.balance_of(addr(2)), 0);
    }

    #[test]
    fn attach_moves_value() {
        let bank = Bank::new();
        bank.mint(addr(1), 100).unwrap();
        bank.attach(addr(1), addr(2), 30).unwrap();
        assert_eq!(bank.balance_of(addr(1)), 70);
        assert_eq!(bank.balance_of(addr(2)), 30);
    }

    #[test]
    fn attach_bypasses_hooks() {
        let bank = Bank::new();
        let hook = Arc::new(Rejecting("no".into()));
        bank.register(addr(2), &hook);
        bank.mint(addr(1), 10).unwrap();
        bank.attach(addr(1), addr(2), 10).unwrap();
        assert_eq!(bank.balance_of(addr(2)), 10);
    }

    #[test]
    fn attach_insufficient_is_atomic() {
        let bank = Bank::new();
        bank.mint(addr(1), 5).unwrap();
        let err = bank.attach(addr(1), addr(2), 6).unwrap_err();
        assert_eq!(err, BankError::InsufficientValue { address: addr(1), have: 5, need: 6 });
        assert_eq!(bank.balance_of(addr(1)), 5);
        assert_eq!(bank.balance_of(addr(2)), 0);
    }

    #[test]
    fn send_without_hook_credits() {
        let bank = Bank::new();
        bank.mint(addr(1), 10).unwrap();
        bank.send(addr(1), addr(2), 4).unwrap();
        assert_eq!(bank.balance_of(addr(1)), 6);
        assert_eq!(bank.balance_of(addr(2)), 4);
        assert_eq!(bank.in_flight(), 0);
    }

    #[test]
    fn rejected_send_refunds_sender() {
        let bank = Bank::new();
        let hook = Arc::new(Rejecting("not accepting".into()));
        bank.register(addr(2), &hook);
        bank.mint(addr(1), 10).unwrap();

        let err = bank.send(addr(1), addr(2), 4).unwrap_err();
        assert_eq!(
            err,
            BankError::Rejected { address: addr(2), reason: "not accepting".into() }
        );
        assert_eq!(bank.balance_of(addr(1)), 10);
        assert_eq!(bank.balance_of(addr(2)), 0);
        assert_eq!(bank.in_flight(), 0);
    }

    #[test]
    fn oversized_reason_truncated() {
        let bank = Bank::new();
        let hook = Arc::new(Rejecting("r".repeat(100_000)));
        bank.register(addr(2), &hook);
        bank.mint(addr(1), 1).unwrap();
        match bank.send(addr(1), addr(2), 1).unwrap_err() {
            BankError::Rejected { reason, .. } => assert_eq!(reason.len(), MAX_FAILURE_REASON_LEN),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn hook_sees_value_in_flight() {
        let bank = Bank::shared();
        let observer = Arc::new(Observer { bank: bank.clone(), me: addr(2), seen: Mutex::new(None) });
        bank.register(addr(2), &observer);
        bank.mint(addr(1), 10).unwrap();

        bank.send(addr(1), addr(2), 4).unwrap();
        assert_eq!(*observer.seen.lock(), Some((6, 0, 4)));
        assert_eq!(bank.balance_of(addr(2)), 4);
    }

    #[test]
    fn hook_cannot_forward_in_flight_value() {
        let bank = Bank::shared();
        let fwd = Arc::new(Forwarder { bank: bank.clone(), me: addr(2), result: Mutex::new(None) });
        bank.register(addr(2), &fwd);
        bank.mint(addr(1), 10).unwrap();

        assert!(bank.send(addr(1), addr(2), 10).is_err());
        assert!(matches!(
            *fwd.result.lock(),
            Some(Err(BankError::InsufficientValue { .. }))
        ));
        assert_eq!(bank.balance_of(addr(1)), 10);
        assert_eq!(bank.balance_of(addr(0xEE)), 0);
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let bank = Bank::new();
        {
            let hook = Arc::new(Rejecting("no".into()));
            bank.register(addr(2), &hook);
            assert!(bank.has_receiver(addr(2)));
        }
        assert!(!bank.has_receiver(addr(2)));
        bank.mint(addr(1), 1).unwrap();
        bank.send(addr(1), addr(2), 1).unwrap();
    }

    #[test]
    fn unregister_removes_hook() {
        let bank = Bank::new();
        let hook = Arc::new(Rejecting("no".into()));
        bank.register(addr(2), &hook);
        bank.unregister(addr(2));
        bank.mint(addr(1), 1).unwrap();
        bank.send(addr(1), addr(2), 1).unwrap();
        assert_eq!(bank.balance_of(addr(2)), 1);
    }
}
