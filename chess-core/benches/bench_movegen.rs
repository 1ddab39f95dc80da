use chess_core::position::perft::perft;
use chess_core::Position;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_perft_4_from_start(c: &mut Criterion) {
    let pos = Position::new_standard();
    c.bench_function("perft_4_startpos", |b| b.iter(|| perft(black_box(&pos), 4)));
}

fn bench_perft_3_kiwipete(c: &mut Criterion) {
    let pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    c.bench_function("perft_3_kiwipete", |b| b.iter(|| perft(black_box(&pos), 3)));
}

fn bench_evaluate_startpos(c: &mut Criterion) {
    let pos = Position::new_standard();
    c.bench_function("evaluate_startpos", |b| b.iter(|| chess_core::eval::evaluate(black_box(&pos))));
}

criterion_group!(benches, bench_perft_4_from_start, bench_perft_3_kiwipete, bench_evaluate_startpos);
criterion_main!(benches);
