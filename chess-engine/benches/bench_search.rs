use chess_core::Position;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chess_engine::eval_cache::EvalCache;
use chess_engine::tb::NoTablebase;
use chess_engine::threadpool::{self, ThreadPoolConfig};
use chess_engine::time::{Limits, LimitKindStorage, TimeManager};
use chess_engine::sync::StopFlag;
use chess_engine::tt::TranspositionTable;

fn search_to_depth(pos: &Position, depth: i32) {
    let tt = TranspositionTable::new(16);
    let eval_cache = EvalCache::new(8);
    let stop = StopFlag::new();
    let tb = NoTablebase;
    let limits = Limits { limits_type: Some(LimitKindStorage::Depth(depth)), ..Default::default() };
    let time = TimeManager::init(std::time::Instant::now(), &limits, pos.side_to_move(), pos.fullmove_number());
    let config = ThreadPoolConfig { threads: 1, multi_pv: 1 };
    black_box(threadpool::search(pos, &tt, &eval_cache, &tb, &stop, &time, &config, &[], |_| {}));
}

fn bench_startpos_depth_4(c: &mut Criterion) {
    let pos = Position::new_standard();
    c.bench_function("search_startpos_depth_4", |b| b.iter(|| search_to_depth(&pos, 4)));
}

fn bench_startpos_depth_6(c: &mut Criterion) {
    let pos = Position::new_standard();
    c.bench_function("search_startpos_depth_6", |b| b.iter(|| search_to_depth(&pos, 6)));
}

fn bench_kiwipete_depth_4(c: &mut Criterion) {
    let pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    c.bench_function("search_kiwipete_depth_4", |b| b.iter(|| search_to_depth(&pos, 4)));
}

criterion_group!(benches, bench_startpos_depth_4, bench_startpos_depth_6, bench_kiwipete_depth_4);
criterion_main!(benches);
