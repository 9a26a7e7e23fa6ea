//! Audit events emitted by the ledger and router.
//!
//! Every event carries the amounts involved so an off-chain observer can
//! rebuild the conservation and solvency invariants from the event stream
//! alone.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Events emitted by the claim-token ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Claim tokens moved between holders.
    Transfer { from: Address, to: Address, amount: u128 },
    /// An allowance was set.
    Approval { owner: Address, spender: Address, amount: u128 },
    /// A deposit was accepted and folded into the accrual index.
    Distributed {
        caller: Address,
        amount: u128,
        accrual_index: u128,
        total_revenue_received: u128,
    },
    /// Accrued value was paid out.
    Claimed { holder: Address, recipient: Address, amount: u128 },
    /// The series was marked inactive after maturity.
    SeriesMatured { timestamp: u64, total_revenue_received: u128 },
    OwnershipTransferred { previous: Address, new_owner: Address },
}

/// Events emitted by the revenue router.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RouterEvent {
    /// Value entered the router and is pending routing.
    RevenueReceived { from: Address, amount: u128, pending_to_route: u128 },
    /// Pending value was split; the ledger accepted its share.
    RevenueRouted { to_ledger: u128, protocol_share: u128 },
    /// The forwarding call failed; the whole amount stays with the router.
    RouteFailed { amount: u128, ledger_share: u128, reason: String },
    WithdrawnToProtocol { to: Address, amount: u128 },
    EmergencyWithdrawal { to: Address, amount: u128 },
    LedgerBound { ledger: Address },
    Paused { by: Address },
    Unpaused { by: Address },
    OwnershipTransferred { previous: Address, new_owner: Address },
}

/// Append-only in-memory event log.
#[derive(Debug)]
pub struct EventLog<E> {
    entries: Mutex<Vec<E>>,
}

impl<E: Clone> EventLog<E> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    /// Append an event.
    pub fn emit(&self, event: E) {
        self.entries.lock().push(event);
    }

    /// Copy of every event emitted so far, oldest first.
    pub fn snapshot(&self) -> Vec<E> {
        self.entries.lock().clone()
    }

    /// Most recent event, if any.
    pub fn last(&self) -> Option<E> {
        self.entries.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<E: Clone> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_order() {
        let log = EventLog::new();
        log.emit(RouterEvent::Paused { by: Address::ZERO });
        log.emit(RouterEvent::Unpaused { by: Address::ZERO });
        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot()[0], RouterEvent::Paused { by: Address::ZERO });
        assert_eq!(log.last(), Some(RouterEvent::Unpaused { by: Address::ZERO }));
    }

    #[test]
    fn empty_log() {
        let log: EventLog<LedgerEvent> = EventLog::default();
        assert!(log.is_empty());
        assert_eq!(log.last(), None);
    }

    #[test]
    fn events_serialize_with_tag() {
        let e = LedgerEvent::Claimed {
            holder: Address([1; 20]),
            recipient: Address([2; 20]),
            amount: 5,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["event"], "claimed");
        assert_eq!(json["amount"], 5);
    }
}
