//! Errors surfaced by the simulator.
use thiserror::Error;

use equorum_core::error::{AddressError, BankError, LedgerError, ParamsError, RouterError};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration: {0}")] Config(#[from] ::config::ConfigError),
    #[error("invalid parameters: {0}")] Params(#[from] ParamsError),
    #[error("ledger: {0}")] Ledger(#[from] LedgerError),
    #[error("router: {0}")] Router(#[from] RouterError),
    #[error("bank: {0}")] Bank(#[from] BankError),
    #[error("address: {0}")] Address(#[from] AddressError),
    #[error("invalid amount {input:?}: {reason}")] InvalidAmount { input: String, reason: String },
    #[error("{0} overflows")] Overflow(&'static str),
    #[error("receive hook of {0} belongs to the series")] ProtectedAccount(equorum_core::Address),
    #[error("scenario: {0}")] Scenario(#[from] serde_json::Error),
    #[error("io: {0}")] Io(#[from] std::io::Error),
}
