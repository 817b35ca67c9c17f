//! Deep perft validation against published node counts.

use quartz::perft::perft;
use quartz::state::GameState;

fn init() {
    quartz::zobrist::init_zobrist();
    quartz::bitboard::init_magic_tables();
    quartz::movegen::init_move_tables();
}

#[test]
fn perft_startpos_depth_5() {
    init();
    let state = GameState::startpos();
    assert_eq!(perft(&state, 5), 4_865_609);
}

#[test]
fn perft_kiwipete_depth_4() {
    init();
    let state = GameState::parse_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    assert_eq!(perft(&state, 4), 4_085_603);
}

#[test]
fn perft_position_3_depth_5() {
    init();
    let state = GameState::parse_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
    assert_eq!(perft(&state, 5), 674_624);
}

#[test]
fn perft_position_4_depth_4() {
    init();
    let state = GameState::parse_fen(
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    )
    .unwrap();
    assert_eq!(perft(&state, 4), 422_333);
}

#[test]
fn perft_position_5_depth_4() {
    init();
    let state =
        GameState::parse_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8").unwrap();
    assert_eq!(perft(&state, 4), 2_103_487);
}

#[test]
fn perft_position_6_depth_4() {
    init();
    let state = GameState::parse_fen(
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    )
    .unwrap();
    assert_eq!(perft(&state, 4), 3_894_594);
}
