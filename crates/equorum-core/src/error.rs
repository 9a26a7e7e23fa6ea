//! Error types for the Equorum ledger, router and value host.
use thiserror::Error;

use crate::address::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address length: {0} hex digits, expected 40")] InvalidLength(usize),
    #[error("invalid address hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient value at {address}: have {have}, need {need}")] InsufficientValue { address: Address, have: u128, need: u128 },
    #[error("transfer rejected by {address}: {reason}")] Rejected { address: Address, reason: String },
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller {caller} may not distribute to this series")] NotAuthorized { caller: Address },
    #[error("caller {caller} is not the ledger owner")] NotOwner { caller: Address },
    #[error("no value attached")] NoValue,
    #[error("distribution too small: {amount} < minimum {minimum}")] DistributionTooSmall { amount: u128, minimum: u128 },
    #[error("series matured at {maturity} (now {now})")] SeriesMatured { maturity: u64, now: u64 },
    #[error("series is inactive")] SeriesInactive,
    #[error("series matures at {maturity} (now {now})")] NotYetMatured { maturity: u64, now: u64 },
    #[error("series already matured")] AlreadyMatured,
    #[error("nothing to claim for {holder}")] NothingToClaim { holder: Address },
    #[error("claim target is the null address")] InvalidUser,
    #[error("recipient is the null address")] InvalidRecipient,
    #[error("spender is the null address")] InvalidSpender,
    #[error("new owner is the null address")] InvalidOwner,
    #[error("insufficient token balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u128, need: u128 },
    #[error("payout to {recipient} failed: {reason}")] PayoutFailed { recipient: Address, reason: String },
    #[error("reentrant call rejected")] Reentrancy,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("value host: {0}")] Bank(#[from] BankError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("caller {caller} is not authorized")] NotAuthorized { caller: Address },
    #[error("router is paused")] Paused,
    #[error("router is already paused")] AlreadyPaused,
    #[error("router is not paused")] NotPaused,
    #[error("no value attached")] NoValue,
    #[error("no pending revenue to route")] NoPendingRevenue,
    #[error("{pending} pending revenue must be routed first")] PendingRevenueMustRouteFirst { pending: u128 },
    #[error("insufficient available balance: available {available}, requested {requested}")] InsufficientAvailableBalance { available: u128, requested: u128 },
    #[error("no available balance")] NoAvailableBalance,
    #[error("share {bps} bps exceeds 10000")] InvalidShare { bps: u16 },
    #[error("ledger not bound")] LedgerNotBound,
    #[error("ledger already bound to {0}")] LedgerAlreadyBound(Address),
    #[error("null address")] InvalidAddress,
    #[error("router cannot pay out to its own address")] SelfPayout,
    #[error("reentrant call rejected")] Reentrancy,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("value host: {0}")] Bank(#[from] BankError),
}

/// Failure of a call made through the [`RevenueSink`](crate::traits::RevenueSink) seam.
///
/// The router records these instead of propagating them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkFailure {
    #[error("call budget exhausted: needed {needed}, remaining {remaining}")] BudgetExhausted { needed: u64, remaining: u64 },
    #[error("reverted: {0}")] Reverted(String),
    #[error("panicked: {0}")] Panicked(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("series name is empty")] EmptyName,
    #[error("series symbol is empty")] EmptySymbol,
    #[error("protocol address is null")] NullProtocol,
    #[error("router address is null")] NullRouter,
    #[error("protocol and router share address {0}")] ProtocolIsRouter(Address),
    #[error("share {bps} bps outside [{min}, {max}]")] ShareOutOfBounds { bps: u16, min: u16, max: u16 },
    #[error("maturity {secs}s outside [{min}, {max}]")] MaturityOutOfBounds { secs: u64, min: u64, max: u64 },
    #[error("total supply {supply} outside [{min}, {max}]")] SupplyOutOfBounds { supply: u128, min: u128, max: u128 },
    #[error("minimum distribution {got} below floor {floor}")] MinimumDistributionTooLow { got: u128, floor: u128 },
    #[error("invalid bounds: {0}")] InvalidBounds(String),
}

#[derive(Error, Debug)]
pub enum EquorumError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Bank(#[from] BankError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Router(#[from] RouterError),
    #[error(transparent)] Sink(#[from] SinkFailure),
    #[error(transparent)] Params(#[from] ParamsError),
}

/// Cut `reason` to at most `max` bytes without splitting a character.
pub fn truncate_reason(reason: &str, max: usize) -> String {
    if reason.len() <= max {
        return reason.to_string();
    }
    let mut end = max;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_string()
}
