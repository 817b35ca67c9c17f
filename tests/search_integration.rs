//! End-to-end search behavior: mates, hash integrity under random play,
//! and time-controlled termination.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::IndexedRandom;

use quartz::movegen::MoveGenerator;
use quartz::parameters::SearchParameters;
use quartz::search::{self, Limits, SearchData, MATE_SCORE};
use quartz::state::GameState;
use quartz::time::{TimeControl, TimeManager};
use quartz::tt::TranspositionTable;

fn init() {
    quartz::zobrist::init_zobrist();
    quartz::bitboard::init_magic_tables();
    quartz::movegen::init_move_tables();
}

fn run_search(state: &GameState, limits: Limits) -> search::SearchReport {
    let tt = TranspositionTable::new(16);
    let stop = Arc::new(AtomicBool::new(false));
    let mut data = SearchData::new();
    let params = SearchParameters::default();
    search::search(
        state,
        limits,
        &tt,
        stop,
        false,
        &[state.hash],
        &mut data,
        &params,
        1,
    )
}

#[test]
fn mate_in_one_is_played_and_mates() {
    init();
    let state = GameState::parse_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
    let report = run_search(&state, Limits::FixedDepth(4));

    assert!(
        report.score > MATE_SCORE,
        "expected a mate score, got {}",
        report.score
    );

    // Executing the move must leave black mated
    let best = report.best_move.expect("a best move");
    let after = state.make_move(best).expect("legal best move");
    assert!(search::is_in_check(&after));
    assert!(search::collect_legal_moves(&after).is_empty());
}

#[test]
fn mate_in_two_is_found() {
    init();
    // Rook ladder: Rb7 boxes the king in, Ra8 mates
    let state = GameState::parse_fen("6k1/8/8/8/8/8/R7/1R4K1 w - - 0 1").unwrap();
    let report = run_search(&state, Limits::FixedDepth(6));
    assert!(
        report.score > MATE_SCORE,
        "expected a mate score, got {}",
        report.score
    );
}

#[test]
fn random_walk_preserves_invariants() {
    init();
    let mut rng = rand::rng();
    let mut state = GameState::startpos();

    for _ in 0..2000 {
        let mut generator = MoveGenerator::new();
        generator.generate_moves(&state);
        let candidates: Vec<_> = (0..generator.list.count)
            .map(|i| generator.list.moves[i])
            .collect();

        let legal: Vec<_> = candidates
            .iter()
            .filter_map(|&mv| state.make_move(mv).map(|next| (mv, next)))
            .collect();

        if legal.is_empty() || state.halfmove_clock >= 100 {
            state = GameState::startpos();
            continue;
        }

        let (_, next) = *legal.choose(&mut rng).unwrap();

        // Every reachable position satisfies the full invariant set
        assert!(next.check_consistency(), "desync after move in {}", state.to_fen());
        assert_eq!(next.hash, next.compute_hash());

        // FEN round-trip reconstructs an identical position
        let reparsed = GameState::parse_fen(&next.to_fen()).unwrap();
        assert_eq!(reparsed.hash, next.hash);
        assert_eq!(reparsed.board, next.board);
        assert_eq!(reparsed.castling_rights, next.castling_rights);

        state = next;
    }
}

#[test]
fn timed_search_respects_the_clock() {
    init();
    let state = GameState::startpos();
    let tm = TimeManager::new(
        TimeControl::GameTime {
            wtime: 1000,
            btime: 1000,
            winc: 0,
            binc: 0,
            movestogo: None,
        },
        0,
        10,
    );

    let start = Instant::now();
    // main_thread drives the deadline checks
    let tt = TranspositionTable::new(16);
    let stop = Arc::new(AtomicBool::new(false));
    let mut data = SearchData::new();
    let params = SearchParameters::default();
    let report = search::search(
        &state,
        Limits::FixedTime(tm),
        &tt,
        stop,
        true,
        &[state.hash],
        &mut data,
        &params,
        1,
    );
    let elapsed = start.elapsed();

    assert!(report.best_move.is_some());
    // The 1s clock must never be exhausted; generous slack for CI noise
    assert!(
        elapsed < Duration::from_millis(1000),
        "search overran the clock: {:?}",
        elapsed
    );
}

#[test]
fn multipv_reports_distinct_lines() {
    init();
    let state = GameState::startpos();
    let tt = Arc::new(TranspositionTable::new(16));
    let stop = Arc::new(AtomicBool::new(false));
    let params = SearchParameters::default();

    let report = search::run_search_threads(
        state,
        Limits::FixedDepth(5),
        Arc::clone(&tt),
        stop,
        1,
        3,
        params,
        vec![state.hash],
    );
    assert!(report.best_move.is_some());
}

#[test]
fn smp_search_terminates_and_agrees_on_legality() {
    init();
    let state = GameState::parse_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let tt = Arc::new(TranspositionTable::new(16));
    let stop = Arc::new(AtomicBool::new(false));
    let params = SearchParameters::default();

    let report = search::run_search_threads(
        state,
        Limits::FixedDepth(6),
        Arc::clone(&tt),
        stop,
        4,
        1,
        params,
        vec![state.hash],
    );

    let best = report.best_move.expect("a best move");
    assert!(
        search::collect_legal_moves(&state)
            .iter()
            .any(|m| m.matches(best)),
        "SMP produced an illegal move"
    );
}
