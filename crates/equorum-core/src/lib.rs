//! # equorum-core
//! Foundation types and traits shared by the Equorum ledger and router.

pub mod address;
pub mod bank;
pub mod clock;
pub mod constants;
pub mod error;
pub mod events;
pub mod guard;
pub mod math;
pub mod params;
pub mod traits;

pub use address::Address;
pub use bank::Bank;
pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{GuardToken, ReentrancyGuard};
pub use traits::{CallBudget, RevenueSink, ValueReceiver};
