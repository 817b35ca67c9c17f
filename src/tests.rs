//! Cross-module regression tests.

#[cfg(test)]
mod tests {
    use crate::movegen::MoveGenerator;
    use crate::search;
    use crate::state::{GameState, Move, FLAG_CAPTURE, P, Q, R};
    use crate::tt::TranspositionTable;

    fn init() {
        crate::zobrist::init_zobrist();
        crate::bitboard::init_magic_tables();
        crate::movegen::init_move_tables();
    }

    /// A TT move recovered under a hash collision belongs to some other
    /// position; the sanity filter must refuse it before it reaches
    /// make_move.
    #[test]
    fn test_foreign_tt_moves_are_rejected() {
        init();
        let tt = TranspositionTable::new(1);

        let source = GameState::parse_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let target = GameState::parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();

        let mut generator = MoveGenerator::new();
        generator.generate_moves(&source);

        for i in 0..generator.list.count {
            let mv = generator.list.moves[i];
            if tt.is_pseudo_legal(&target, mv) {
                // The only moves both positions share are king steps off e1
                assert_eq!(mv.piece(), crate::state::K);
                assert!(target.make_move(mv).is_some());
            }
        }
    }

    #[test]
    fn test_garbage_moves_never_pass_the_filter() {
        init();
        let state = GameState::startpos();
        let tt = TranspositionTable::new(1);

        // Capture flag on an empty square
        assert!(!tt.is_pseudo_legal(&state, Move::new(12, 28, P, None, FLAG_CAPTURE)));
        // Rook through its own pawn
        assert!(!tt.is_pseudo_legal(&state, Move::new(0, 16, R, None, 0)));
        // Wrong piece type on the source square
        assert!(!tt.is_pseudo_legal(&state, Move::new(12, 28, Q, None, 0)));
        // Null move
        assert!(!tt.is_pseudo_legal(&state, Move::default()));
    }

    /// The engine must produce a legal move from any playable position.
    #[test]
    fn test_search_output_is_always_legal() {
        init();
        let fens = [
            crate::state::START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "8/P6k/8/8/8/8/7K/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K2R w K - 0 1",
        ];

        for fen in fens {
            let state = GameState::parse_fen(fen).unwrap();
            let tt = TranspositionTable::new(4);
            let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            let mut data = search::SearchData::new();
            let params = crate::parameters::SearchParameters::default();
            let report = search::search(
                &state,
                search::Limits::FixedDepth(3),
                &tt,
                stop,
                false,
                &[state.hash],
                &mut data,
                &params,
                1,
            );

            let best = report.best_move.expect("playable position");
            assert!(
                search::collect_legal_moves(&state)
                    .iter()
                    .any(|m| m.matches(best)),
                "illegal best move in {}",
                fen
            );
        }
    }

    /// Fifty-move rule: positions one quiet move away from the counter
    /// reaching 100 score as draws below the root.
    #[test]
    fn test_fifty_move_rule_draws() {
        init();
        let state = GameState::parse_fen("4k3/8/8/8/8/8/8/4K2R w - - 99 80").unwrap();
        let mv = crate::uci::parse_move(&state, "h1h2").unwrap();
        let next = state.make_move(mv).unwrap();
        assert_eq!(next.halfmove_clock, 100);

        let tt = TranspositionTable::new(1);
        let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut data = search::SearchData::new();
        let params = crate::parameters::SearchParameters::default();
        let report = search::search(
            &next,
            search::Limits::FixedDepth(3),
            &tt,
            stop,
            false,
            &[next.hash],
            &mut data,
            &params,
            1,
        );
        // Rook-up position, but the clock already expired
        assert!(report.score.abs() < 200, "expected a draw-ish score");
    }
}
