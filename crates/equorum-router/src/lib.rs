//! # equorum-router — Splits incoming revenue between a ledger and its protocol.
//!
//! The router accepts value from any payer, forwards a fixed basis-point
//! share to a [`RevenueSink`](equorum_core::RevenueSink) and keeps the rest
//! for the protocol to withdraw. The forwarding call is isolated: a sink that
//! reverts, panics or runs out of budget is recorded as a failed route and
//! the value stays withdrawable, so a broken ledger can never lock funds.

pub mod router;

pub use router::{RevenueRouter, RouteOutcome, RouterParams, RouterStats};
