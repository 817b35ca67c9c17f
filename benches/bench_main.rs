use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quartz::movegen::MoveGenerator;
use quartz::perft::perft;
use quartz::state::GameState;
use quartz::tt::TranspositionTable;
use quartz::{bitboard, eval, movegen, zobrist};

fn init_globals() {
    zobrist::init_zobrist();
    bitboard::init_magic_tables();
    movegen::init_move_tables();
    eval::init_eval();
}

fn bench_make_move(c: &mut Criterion) {
    init_globals();
    let mut group = c.benchmark_group("make_move");
    let state = GameState::startpos();
    let mut gen = MoveGenerator::new();
    gen.generate_moves(&state);
    let mv = gen.list.moves[0];

    group.bench_function("copy_make_startpos", |b| {
        b.iter(|| state.make_move(black_box(mv)))
    });
    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    init_globals();
    let mut group = c.benchmark_group("movegen");
    let kiwipete = GameState::parse_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();

    group.bench_function("generate_kiwipete", |b| {
        b.iter(|| {
            let mut gen = MoveGenerator::new();
            gen.generate_moves(black_box(&kiwipete));
            gen.list.count
        })
    });

    group.bench_function("perft_startpos_d3", |b| {
        let state = GameState::startpos();
        b.iter(|| perft(black_box(&state), 3))
    });
    group.finish();
}

fn bench_tt(c: &mut Criterion) {
    init_globals();
    let mut group = c.benchmark_group("tt");
    let tt = TranspositionTable::new(16);
    let state = GameState::startpos();

    group.bench_function("tt_probe_empty", |b| {
        b.iter(|| tt.probe_data(black_box(state.hash)))
    });

    tt.store(state.hash, 100, None, 5, 1);
    group.bench_function("tt_probe_hit", |b| {
        b.iter(|| tt.probe_data(black_box(state.hash)))
    });
    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    init_globals();
    let mut group = c.benchmark_group("eval");
    let state = GameState::parse_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();

    group.bench_function("hce_kiwipete", |b| {
        b.iter(|| eval::evaluate_hce(black_box(&state)))
    });
    group.finish();
}

criterion_group!(benches, bench_make_move, bench_movegen, bench_tt, bench_eval);
criterion_main!(benches);
