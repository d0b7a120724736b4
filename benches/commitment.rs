use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use fleet_commit::board::{random_fleet, validate_fleet, BoardBits};
use fleet_commit::core::{CellIndex, CellSalts};
use fleet_commit::proof::{commitment_root, BoardCommitment};

fn board(seed: u64) -> (BoardBits, CellSalts) {
    let mut rng = StdRng::seed_from_u64(seed);
    let bits = BoardBits::from_ships(&random_fleet(&mut rng)).expect("random fleet rasterizes");
    (bits, CellSalts::generate(&mut rng, 32))
}

fn bench_commitment_root(c: &mut Criterion) {
    let (bits, salts) = board(1);
    c.bench_function("commitment_root", |b| {
        b.iter(|| commitment_root(black_box("bench"), black_box("0"), &bits, &salts));
    });
}

fn bench_reveal_and_verify(c: &mut Criterion) {
    let (bits, salts) = board(2);
    let commitment = BoardCommitment::build("bench", "0", bits, salts);
    let root_hex = commitment.root_hex();
    let mut group = c.benchmark_group("reveal");

    group.bench_function("build", |b| {
        b.iter(|| commitment.reveal(black_box(CellIndex::new(42).expect("in range"))));
    });

    let reveal = commitment.reveal(CellIndex::new(42).expect("in range"));
    group.bench_function("verify", |b| {
        b.iter(|| assert!(reveal.verify(black_box(&root_hex))));
    });
    group.finish();
}

fn bench_validate_fleet(c: &mut Criterion) {
    let (bits, _) = board(3);
    c.bench_function("validate_fleet", |b| {
        b.iter(|| validate_fleet(black_box(&bits)));
    });
}

criterion_group!(benches, bench_commitment_root, bench_reveal_and_verify, bench_validate_fleet);
criterion_main!(benches);
