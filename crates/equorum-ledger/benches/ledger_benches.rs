//! Criterion benchmarks for equorum-ledger hot paths.
//!
//! Distribution cost must not depend on the number of holders; the two
//! `distribute_*_holders` benches should report the same time.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use equorum_core::constants::{SECONDS_PER_DAY, UNIT};
use equorum_core::params::SeriesParams;
use equorum_core::{Address, Bank, ManualClock};
use equorum_ledger::RevenueLedger;

const SUPPLY: u128 = 1_000_000 * UNIT;

fn ledger_with_holders(holders: usize) -> (Arc<RevenueLedger>, Address) {
    let protocol = Address::from_label("protocol");
    let params = SeriesParams {
        name: "Bench Series".into(),
        symbol: "BENCH".into(),
        protocol,
        router: Address::from_label("router"),
        share_bps: 2_000,
        maturity_duration_secs: 365 * SECONDS_PER_DAY,
        total_supply: SUPPLY,
        minimum_distribution: 1,
    };
    let bank = Bank::shared();
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let ledger = RevenueLedger::new(Address::from_label("ledger"), &params, bank.clone(), clock)
        .expect("valid params");
    bank.mint(protocol, u128::MAX / 2).expect("mint");

    for i in 0..holders {
        let holder = Address::from_label(&format!("holder-{i}"));
        ledger.transfer(protocol, holder, UNIT).expect("transfer");
    }
    (ledger, protocol)
}

fn bench_distribute_few_holders(c: &mut Criterion) {
    let (ledger, protocol) = ledger_with_holders(10);
    c.bench_function("distribute_10_holders", |b| {
        b.iter(|| ledger.distribute(black_box(protocol), black_box(UNIT)))
    });
}

fn bench_distribute_many_holders(c: &mut Criterion) {
    let (ledger, protocol) = ledger_with_holders(10_000);
    c.bench_function("distribute_10000_holders", |b| {
        b.iter(|| ledger.distribute(black_box(protocol), black_box(UNIT)))
    });
}

fn bench_transfer(c: &mut Criterion) {
    let (ledger, protocol) = ledger_with_holders(100);
    let holder = Address::from_label("holder-0");
    ledger.distribute(protocol, UNIT).expect("distribute");
    c.bench_function("transfer_with_fold", |b| {
        b.iter(|| ledger.transfer(black_box(protocol), black_box(holder), black_box(1)))
    });
}

fn bench_distribute_and_claim(c: &mut Criterion) {
    let (ledger, protocol) = ledger_with_holders(100);
    c.bench_function("distribute_and_claim", |b| {
        b.iter(|| {
            ledger.distribute(protocol, UNIT).expect("distribute");
            ledger.claim(black_box(protocol)).expect("claim")
        })
    });
}

criterion_group!(
    benches,
    bench_distribute_few_holders,
    bench_distribute_many_holders,
    bench_transfer,
    bench_distribute_and_claim,
);
criterion_main!(benches);
