//! Property-based invariant suite.
//!
//! Random sequences of deposits, routes, transfers, claims, refusals,
//! withdrawals and clock jumps are applied to a fresh series. After every
//! operation, whether it succeeded or not, the accounting invariants must
//! hold:
//! - Router conservation: routed + returned + balance == received
//! - Ledger solvency: held value covers every outstanding claim
//! - Ledger accounting: held value + claimed == revenue received
//! - Supply: token balances sum to the fixed supply
//! - Monotonicity: the accrual index and the router totals never decrease

use std::sync::Arc;

use proptest::prelude::*;

use equorum_core::constants::{SECONDS_PER_DAY, UNIT};
use equorum_core::{Address, Clock};
use equorum_tests::helpers::*;

const ACTORS: usize = 4;

#[derive(Clone, Debug)]
enum Op {
    /// Deposit as call value, in thousandths of a unit.
    Deposit(u64),
    /// Plain value transfer to the router.
    Send(u64),
    Route,
    /// Move a percentage of one actor's tokens to another.
    Transfer { from: usize, to: usize, percent: u8 },
    Claim(usize),
    ClaimFor { caller: usize, user: usize },
    Refuse(usize, bool),
    Withdraw,
    Pause(bool),
    Advance(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u64..50_000_000).prop_map(Op::Deposit),
        2 => (1u64..50_000_000).prop_map(Op::Send),
        4 => Just(Op::Route),
        3 => (0..ACTORS, 0..ACTORS, 0u8..=100).prop_map(|(from, to, percent)| Op::Transfer { from, to, percent }),
        3 => (0..ACTORS).prop_map(Op::Claim),
        2 => (0..ACTORS, 0..ACTORS).prop_map(|(caller, user)| Op::ClaimFor { caller, user }),
        1 => (1..ACTORS, any::<bool>()).prop_map(|(i, refuse)| Op::Refuse(i, refuse)),
        1 => Just(Op::Withdraw),
        1 => any::<bool>().prop_map(Op::Pause),
        1 => (0u16..60).prop_map(Op::Advance),
    ]
}

struct World {
    f: Fixture,
    actors: Vec<Address>,
    hooks: Vec<Option<Arc<Toggle>>>,
}

impl World {
    fn new() -> Self {
        let f = Fixture::new();
        // Actor 0 is the protocol and always accepts value.
        let actors: Vec<Address> = std::iter::once(protocol())
            .chain((1..ACTORS).map(|i| addr(&format!("actor-{i}"))))
            .collect();
        let hooks = actors
            .iter()
            .enumerate()
            .map(|(i, a)| (i > 0).then(|| Toggle::install(&f.bank, *a)))
            .collect();
        f.fund(payer(), u128::from(u64::MAX) * UNIT);
        Self { f, actors, hooks }
    }

    fn apply(&self, op: &Op) {
        let ledger = self.f.ledger();
        let router = self.f.router();
        let milli = |m: u64| u128::from(m) * UNIT / 1_000;
        let _ = match *op {
            Op::Deposit(m) => router.deposit(payer(), milli(m)).map(drop).map_err(drop),
            Op::Send(m) => self.f.bank.send(payer(), router.address(), milli(m)).map_err(drop),
            Op::Route => router.route_revenue().map(drop).map_err(drop),
            Op::Transfer { from, to, percent } => {
                let from = self.actors[from];
                let amount = ledger.balance_of(from) * u128::from(percent) / 100;
                ledger.transfer(from, self.actors[to], amount).map_err(drop)
            }
            Op::Claim(i) => ledger.claim(self.actors[i]).map(drop).map_err(drop),
            Op::ClaimFor { caller, user } => {
                ledger.claim_for(self.actors[caller], self.actors[user]).map(drop).map_err(drop)
            }
            Op::Refuse(i, refuse) => {
                if let Some(hook) = &self.hooks[i] {
                    hook.set_refusing(refuse);
                }
                Ok(())
            }
            Op::Withdraw => router.withdraw_all_to_protocol(protocol()).map(drop).map_err(drop),
            Op::Pause(true) => router.pause(protocol()).map_err(drop),
            Op::Pause(false) => router.unpause(protocol()).map_err(drop),
            Op::Advance(days) => {
                self.f.clock.advance(u64::from(days) * SECONDS_PER_DAY);
                Ok(())
            }
        };
    }
}

#[derive(Default, Clone, Copy, Debug)]
struct Totals {
    index: u128,
    received: u128,
    routed: u128,
    returned: u128,
    revenue: u128,
    claimed: u128,
}

impl Totals {
    fn read(f: &Fixture) -> Self {
        Self {
            index: f.ledger().accrual_index(),
            received: f.router().total_received(),
            routed: f.router().total_routed_to_ledger(),
            returned: f.router().total_returned_to_protocol(),
            revenue: f.ledger().total_revenue_received(),
            claimed: f.ledger().total_claimed(),
        }
    }

    fn assert_no_decrease(&self, before: &Self) {
        assert!(self.index >= before.index, "accrual index decreased");
        assert!(self.received >= before.received, "total received decreased");
        assert!(self.routed >= before.routed, "total routed decreased");
        assert!(self.returned >= before.returned, "total returned decreased");
        assert!(self.revenue >= before.revenue, "ledger revenue decreased");
        assert!(self.claimed >= before.claimed, "total claimed decreased");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Accounting invariants survive any sequence of operations.
    #[test]
    fn invariants_hold_under_random_operations(ops in prop::collection::vec(op(), 1..60)) {
        let world = World::new();
        let mut before = Totals::read(&world.f);
        for op in &ops {
            world.apply(op);
            world.f.assert_invariants();
            let after = Totals::read(&world.f);
            after.assert_no_decrease(&before);
            before = after;
        }
    }

    /// Tokens acquired after a distribution earn nothing from it.
    #[test]
    fn no_retroactive_accrual(
        deposits in prop::collection::vec(1u64..1_000_000, 1..8),
        share in 1u128..=500_000,
    ) {
        let f = Fixture::new();
        for d in &deposits {
            f.fund(protocol(), u128::from(*d) * UNIT);
            f.ledger().distribute(protocol(), u128::from(*d) * UNIT).unwrap();
        }
        let late = addr("late");
        f.give_tokens(late, share * UNIT);
        prop_assert_eq!(f.ledger().calculate_claimable(late), 0);
        prop_assert_eq!(f.ledger().claim(late).unwrap_err(), equorum_core::error::LedgerError::NothingToClaim { holder: late });
        f.assert_invariants();
    }

    /// A refused relayed claim changes nothing, however often it is retried.
    #[test]
    fn refused_claim_for_is_idempotent(
        deposit in 1u64..1_000_000,
        share in 1u128..=500_000,
        retries in 1usize..5,
    ) {
        let f = Fixture::new();
        let holder = addr("holder");
        let hook = Toggle::install(&f.bank, holder);
        f.give_tokens(holder, share * UNIT);
        f.fund(protocol(), u128::from(deposit) * UNIT);
        f.ledger().distribute(protocol(), u128::from(deposit) * UNIT).unwrap();
        hook.set_refusing(true);

        let claimable = f.ledger().calculate_claimable(holder);
        let pending = f.ledger().pending_reward(holder);
        let seen = f.ledger().last_index_seen(holder);
        let value = f.ledger().value_balance();
        for _ in 0..retries {
            prop_assert!(f.ledger().claim_for(addr("relayer"), holder).is_err());
            prop_assert_eq!(f.ledger().calculate_claimable(holder), claimable);
            prop_assert_eq!(f.ledger().pending_reward(holder), pending);
            prop_assert_eq!(f.ledger().last_index_seen(holder), seen);
            prop_assert_eq!(f.ledger().value_balance(), value);
            prop_assert_eq!(f.ledger().total_claimed(), 0);
        }

        hook.set_refusing(false);
        prop_assert_eq!(f.ledger().claim(holder).unwrap(), claimable);
        prop_assert_eq!(hook.received(), claimable);
        f.assert_invariants();
    }

    /// Payouts never exceed what was distributed, and rounding never
    /// favours holders.
    #[test]
    fn payouts_bounded_by_distributions(
        splits in prop::collection::vec(1u128..=300_000, 1..4),
        deposits in prop::collection::vec(1u64..1_000_000_000, 1..6),
    ) {
        let f = Fixture::new();
        let holders: Vec<Address> = (0..splits.len()).map(|i| addr(&format!("h{i}"))).collect();
        for (holder, tokens) in holders.iter().zip(&splits) {
            f.give_tokens(*holder, tokens * UNIT);
        }
        let mut distributed = 0u128;
        for d in &deposits {
            let amount = u128::from(*d) * 1_000;
            f.fund(protocol(), amount);
            f.ledger().distribute(protocol(), amount).unwrap();
            distributed += amount;
        }

        let mut paid = 0u128;
        for holder in holders.iter().chain(std::iter::once(&protocol())) {
            if let Ok(amount) = f.ledger().claim(*holder) {
                paid += amount;
            }
        }
        prop_assert!(paid <= distributed);
        prop_assert_eq!(f.ledger().value_balance(), distributed - paid);
        f.assert_invariants();
    }
}

#[test]
fn clock_jumps_past_maturity_are_handled() {
    let world = World::new();
    world.apply(&Op::Deposit(10_000));
    for _ in 0..8 {
        world.apply(&Op::Advance(59));
    }
    assert!(world.f.clock.now() >= world.f.ledger().maturity_timestamp());
    world.apply(&Op::Route);
    assert_eq!(world.f.router().failed_route_attempts(), 1);
    world.apply(&Op::Withdraw);
    assert_eq!(world.f.router().balance(), 0);
    world.f.assert_invariants();
}
