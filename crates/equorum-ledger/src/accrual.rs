//! Accrual index math.
//!
//! The ledger keeps one global index of value-per-token. Holders snapshot the
//! index whenever their balance changes; the difference between the current
//! index and their snapshot, times their balance, is what they have earned
//! since. Both divisions floor, so rounding dust always stays in the ledger.

use equorum_core::constants::ACCRUAL_SCALE;
use equorum_core::math::mul_div_floor;

/// Index increase for a deposit of `amount` over `total_supply` tokens.
///
/// `amount * ACCRUAL_SCALE / total_supply`, floored. `None` on overflow or a
/// zero supply.
pub fn index_delta(amount: u128, total_supply: u128) -> Option<u128> {
    mul_div_floor(amount, ACCRUAL_SCALE, total_supply)
}

/// Reward earned by `balance` tokens while the index moved from `last_seen`
/// to `index`.
///
/// `balance * (index - last_seen) / ACCRUAL_SCALE`, floored. Zero if the index
/// has not moved past the snapshot.
pub fn accrued_since(balance: u128, index: u128, last_seen: u128) -> Option<u128> {
    if index <= last_seen || balance == 0 {
        return Some(0);
    }
    mul_div_floor(balance, index - last_seen, ACCRUAL_SCALE)
}

/// Per-holder ledger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HolderAccount {
    /// Claim-token balance.
    pub balance: u128,
    /// Reward folded in at earlier balance changes and not yet claimed.
    pub pending_reward: u128,
    /// Accrual index at the last balance-affecting event or claim.
    pub last_index_seen: u128,
}

impl HolderAccount {
    /// Total claimable at `index`: folded reward plus reward accrued since the snapshot.
    pub fn claimable(&self, index: u128) -> Option<u128> {
        let accrued = accrued_since(self.balance, index, self.last_index_seen)?;
        self.pending_reward.checked_add(accrued)
    }

    /// Fold reward accrued up to `index` into `pending_reward` and move the
    /// snapshot to `index`. Leaves `claimable(index)` unchanged; folding twice
    /// at the same index is a no-op.
    pub fn fold(&mut self, index: u128) -> Option<()> {
        let accrued = accrued_since(self.balance, index, self.last_index_seen)?;
        self.pending_reward = self.pending_reward.checked_add(accrued)?;
        self.last_index_seen = self.last_index_seen.max(index);
        Some(())
    }
}
