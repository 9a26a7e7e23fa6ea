//! Adversarial test suite for Equorum revenue series.
//!
//! Integration tests that drive a deployed ledger + router pair the way
//! hostile holders, sinks and callers would, and check that value is never
//! lost, duplicated or paid to the wrong account.

pub mod helpers;
