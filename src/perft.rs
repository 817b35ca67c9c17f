use crate::movegen::MoveGenerator;
use crate::search::square_to_coord;
use crate::state::GameState;
use std::time::Instant;

pub fn run_perft_suite() {
    println!("--- Quartz Perft Suite ---");

    let positions = [
        (
            "Start Position",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            [1u64, 20, 400, 8902, 197281, 4865609], // Depths 0-5
        ),
        (
            "Position 2 (Kiwipete)",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            [1, 48, 2039, 97862, 4085603, 193690690],
        ),
        (
            "Position 3",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            [1, 14, 191, 2812, 43238, 674624],
        ),
        (
            "Position 4",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            [1, 6, 264, 9467, 422333, 15833292],
        ),
        (
            "Position 5",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            [1, 44, 1486, 62379, 2103487, 89941194],
        ),
        (
            "Position 6",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            [1, 46, 2079, 89890, 3894594, 164075551],
        ),
    ];

    let mut total_nodes = 0;
    let mut total_time = 0;

    for (name, fen, expected) in positions.iter() {
        println!("\nTesting: {}", name);
        let state = GameState::parse_fen(fen).expect("suite FEN is valid");

        // Depth 4 keeps the suite quick; depth 5 is covered by tests
        let depth = 4;

        let start = Instant::now();
        let nodes = perft(&state, depth as u8);
        let elapsed = start.elapsed().as_millis();

        total_nodes += nodes;
        total_time += elapsed;

        println!("Depth {}: Nodes: {} Time: {}ms", depth, nodes, elapsed);

        if nodes == expected[depth] {
            println!("RESULT: PASS");
        } else {
            println!("RESULT: FAIL (Expected {})", expected[depth]);
            perft_divide(&state, depth as u8);
        }
    }

    println!("\n--- SUITE COMPLETE ---");
    println!("Total Nodes: {}", total_nodes);
    println!("Total Time:  {}ms", total_time);
    if total_time > 0 {
        println!("NPS:         {}", total_nodes as u128 * 1000 / total_time);
    }
}

// Recursive perft function
pub fn perft(state: &GameState, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);

    for i in 0..generator.list.count {
        let mv = generator.list.moves[i];
        // make_move filters illegal pseudo-legal moves
        if let Some(next_state) = state.make_move(mv) {
            nodes += perft(&next_state, depth - 1);
        }
    }
    nodes
}

// Debugging tool: Prints move counts for the first ply
pub fn perft_divide(state: &GameState, depth: u8) {
    println!("--- Perft Divide Depth {} ---", depth);
    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);

    let mut total = 0;

    for i in 0..generator.list.count {
        let mv = generator.list.moves[i];
        if let Some(next_state) = state.make_move(mv) {
            let count = perft(&next_state, depth - 1);
            println!(
                "{}{}: {}",
                square_to_coord(mv.source()),
                square_to_coord(mv.target()),
                count
            );
            total += count;
        }
    }
    println!("Total: {}", total);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        crate::zobrist::init_zobrist();
        crate::bitboard::init_magic_tables();
        crate::movegen::init_move_tables();
    }

    #[test]
    fn test_perft_start_pos() {
        init();
        let state = GameState::startpos();
        assert_eq!(perft(&state, 1), 20);
        assert_eq!(perft(&state, 2), 400);
        assert_eq!(perft(&state, 3), 8902);
        assert_eq!(perft(&state, 4), 197281);
    }

    #[test]
    fn test_perft_kiwipete() {
        init();
        let state = GameState::parse_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&state, 1), 48);
        assert_eq!(perft(&state, 2), 2039);
        assert_eq!(perft(&state, 3), 97862);
    }

    #[test]
    fn test_perft_position_3() {
        init();
        let state = GameState::parse_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&state, 1), 14);
        assert_eq!(perft(&state, 2), 191);
        assert_eq!(perft(&state, 3), 2812);
        assert_eq!(perft(&state, 4), 43238);
    }

    #[test]
    fn test_perft_position_4_promotions() {
        init();
        let state = GameState::parse_fen(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&state, 1), 6);
        assert_eq!(perft(&state, 2), 264);
        assert_eq!(perft(&state, 3), 9467);
    }

    #[test]
    fn test_perft_position_5() {
        init();
        let state =
            GameState::parse_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8")
                .unwrap();
        assert_eq!(perft(&state, 1), 44);
        assert_eq!(perft(&state, 2), 1486);
        assert_eq!(perft(&state, 3), 62379);
    }

    #[test]
    fn test_perft_position_6() {
        init();
        let state = GameState::parse_fen(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        )
        .unwrap();
        assert_eq!(perft(&state, 1), 46);
        assert_eq!(perft(&state, 2), 2079);
        assert_eq!(perft(&state, 3), 89890);
    }

    #[test]
    fn test_perft_castling_rights() {
        init();
        let state = GameState::parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(perft(&state, 1), 26);
    }
}
