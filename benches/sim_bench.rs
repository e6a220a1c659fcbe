use allocsim::allocation::{allocate, AllocationParams};
use allocsim::capital::FullReinvestment;
use allocsim::commission::LinearPctCommission;
use allocsim::engine::{LotSizing, SimConfig, Simulator};
use allocsim::types::Panel;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_panels(periods: usize, assets: usize) -> (Panel, Panel) {
    let symbols: Vec<String> = (0..assets).map(|j| format!("A{j}")).collect();

    // Deterministic pseudo-random walk, no RNG dependency needed.
    let mut state = 0x2545f4914f6cdd1du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    let mut prices = vec![vec![100.0; assets]];
    for i in 1..periods {
        let prev = prices[i - 1].clone();
        prices.push(
            prev.iter()
                .map(|p| (p * (1.0 + (next() - 0.5) * 0.02)).max(1.0))
                .collect(),
        );
    }

    let weights: Vec<Vec<f64>> = (0..periods)
        .map(|_| (0..assets).map(|_| (next() - 0.5) * 2.0 / assets as f64).collect())
        .collect();

    (
        Panel::from_rows(symbols.clone(), prices).unwrap(),
        Panel::from_rows(symbols, weights).unwrap(),
    )
}

fn bench_simulation_run(c: &mut Criterion) {
    let (prices, weights) = synthetic_panels(2000, 20);
    let commission = LinearPctCommission::new(0.001);

    let mut group = c.benchmark_group("simulation");

    group.bench_function("run_2000x20_whole_shares", |b| {
        let sim = Simulator::new(SimConfig {
            initial_capital: 1_000_000.0,
            trade_buffer: 0.01,
            ..Default::default()
        });
        b.iter(|| {
            sim.run(
                black_box(&prices),
                black_box(&weights),
                None,
                &commission,
                &FullReinvestment,
            )
            .unwrap()
        });
    });

    group.bench_function("run_2000x20_continuous", |b| {
        let sim = Simulator::new(SimConfig {
            initial_capital: 1_000_000.0,
            trade_buffer: 0.01,
            lot_sizing: LotSizing::Continuous,
            ..Default::default()
        });
        b.iter(|| {
            sim.run(
                black_box(&prices),
                black_box(&weights),
                None,
                &commission,
                &FullReinvestment,
            )
            .unwrap()
        });
    });

    group.finish();
}

fn bench_allocation(c: &mut Criterion) {
    let n = 50;
    let prices: Vec<f64> = (0..n).map(|j| 50.0 + j as f64).collect();
    let equity: Vec<f64> = (0..n).map(|j| 1000.0 * ((j % 5) as f64 - 2.0)).collect();
    let targets: Vec<f64> = (0..n).map(|j| ((j % 7) as f64 - 3.0) / 100.0).collect();
    let params = AllocationParams {
        trade_buffer: 0.005,
        ..Default::default()
    };

    c.bench_function("allocate_50_assets", |b| {
        b.iter(|| {
            allocate(
                black_box(1_000_000.0),
                black_box(&prices),
                black_box(&equity),
                black_box(&targets),
                &params,
            )
        });
    });
}

criterion_group!(benches, bench_simulation_run, bench_allocation);
criterion_main!(benches);
