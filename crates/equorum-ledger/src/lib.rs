//! # equorum-ledger — Proportional revenue-sharing claim-token ledger.
//!
//! A fixed supply of claim tokens entitles holders to a proportional share of
//! every deposit made while they hold them. All accounting is O(1) per
//! operation regardless of the number of holders:
//! - **Accrual index**: each deposit bumps a global "value per token" index by
//!   `amount * ACCRUAL_SCALE / total_supply`.
//! - **Per-holder snapshots**: a holder's newly accrued reward is
//!   `balance * (index - last_index_seen) / ACCRUAL_SCALE`, folded into
//!   `pending_reward` before any balance change.
//! - **Checked payouts**: claims finalize state before paying out and roll
//!   back completely if the recipient refuses the value.

pub mod accrual;
pub mod ledger;

pub use accrual::HolderAccount;
pub use ledger::{RevenueLedger, SeriesInfo};
