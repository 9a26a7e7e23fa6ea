//! Trait interfaces between Equorum components.
//!
//! These traits define the seams between the ledger, the router and the
//! value host:
//! - [`ValueReceiver`]: code that runs when an address receives a plain
//!   value transfer (the router records a deposit, the ledger refuses)
//! - [`RevenueSink`]: the single entry point the router uses to forward
//!   revenue (equorum-ledger implements)

use crate::address::Address;
use crate::error::SinkFailure;

/// Receive hook attached to an address in the [`Bank`](crate::bank::Bank).
///
/// Invoked by [`Bank::send`](crate::bank::Bank::send) after the sender has
/// been debited and before the recipient is credited. Returning `Err`
/// rejects the transfer and the sender is refunded. Implementations may call
/// back into any component; guarded entry points will refuse such re-entry.
pub trait ValueReceiver: Send + Sync {
    fn receive(&self, from: Address, amount: u128) -> Result<(), String>;
}

/// Work budget for a call across the [`RevenueSink`] seam.
///
/// Bounds how much a downstream call may do before it is considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    remaining: u64,
}

impl CallBudget {
    pub fn new(limit: u64) -> Self {
        Self { remaining: limit }
    }

    /// Consume `units` of work, failing without consuming if too few remain.
    pub fn charge(&mut self, units: u64) -> Result<(), SinkFailure> {
        if units > self.remaining {
            return Err(SinkFailure::BudgetExhausted {
                needed: units,
                remaining: self.remaining,
            });
        }
        self.remaining -= units;
        Ok(())
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

/// Destination for the ledger's share of routed revenue.
///
/// `distribute` carries `amount` of value from `caller` along with the call.
/// On any failure no value moves and no state changes on the sink side.
pub trait RevenueSink: Send + Sync {
    /// Address that receives the forwarded value.
    fn sink_address(&self) -> Address;

    /// Accept `amount` from `caller` as a new distribution.
    fn distribute(
        &self,
        caller: Address,
        amount: u128,
        budget: &mut CallBudget,
    ) -> Result<(), SinkFailure>;
}
